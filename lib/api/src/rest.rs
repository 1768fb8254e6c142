use crate::error::ApiError;
use crate::session::{Mode, SessionContext, SessionStore};
use crate::state::Resources;
use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use carscope_core::analytics::{self, BrowseRequest, VehicleFilter, VehicleMatch};
use carscope_core::{format_thousands, EngineeredInsights, FieldValue, Table, VehicleRecord};
use carscope_features::NearestMatch;
use carscope_model::{BatchInsights, BatchPrediction, ModelError, PriceModel};
use chrono::Timelike;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Largest accepted request body (CSV uploads included)
const MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Serialize)]
struct SimilarVehicle {
    label: String,
    #[serde(flatten)]
    nearest: NearestMatch,
}

#[derive(Serialize)]
struct PredictionResponse {
    predicted_price: f64,
    /// `"$25,000.00"`
    formatted_price: String,
    input: VehicleRecord,
    similar: Option<SimilarVehicle>,
}

#[derive(Serialize)]
struct SearchResponse {
    count: usize,
    vehicles: Vec<VehicleMatch>,
}

#[derive(Serialize)]
struct BatchResponse {
    rows: usize,
    preview: Vec<serde_json::Map<String, serde_json::Value>>,
    results: Vec<serde_json::Map<String, serde_json::Value>>,
    insights: BatchInsights,
}

#[derive(Serialize)]
struct ImportanceEntry {
    feature: String,
    importance: f64,
}

#[derive(Deserialize)]
struct BrowseQuery {
    #[serde(default)]
    start: usize,
    end: Option<usize>,
    search: Option<String>,
    /// Comma-separated column names
    columns: Option<String>,
}

impl From<BrowseQuery> for BrowseRequest {
    fn from(q: BrowseQuery) -> Self {
        BrowseRequest {
            start: q.start,
            end: q.end,
            search: q.search,
            columns: q.columns.map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            }),
        }
    }
}

#[derive(Deserialize)]
struct ModeRequest {
    mode: Mode,
}

#[derive(Deserialize)]
struct FieldsRequest {
    fields: BTreeMap<String, FieldValue>,
}

#[derive(Deserialize)]
struct SelectRequest {
    index: usize,
}

#[derive(Serialize)]
struct SessionUpdate {
    cleared: bool,
    session: SessionContext,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(
        resources: Arc<Resources>,
        sessions: Arc<SessionStore>,
        bind: String,
        port: u16,
    ) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(resources.clone()))
                .app_data(web::Data::new(sessions.clone()))
                .configure(configure)
        })
        .bind((bind.as_str(), port))?
        .run()
        .await
    }
}

/// Register every route. Expects `web::Data<Arc<Resources>>` and
/// `web::Data<Arc<SessionStore>>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
        .app_data(
            web::JsonConfig::default()
                .limit(MAX_PAYLOAD_BYTES)
                .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into()),
        )
        .route("/", web::get().to(index))
        .route("/health", web::get().to(health))
        .route("/vehicles/options", web::get().to(vehicle_options))
        .route("/vehicles/search", web::post().to(search_vehicles))
        .route("/predict", web::post().to(predict))
        .route("/predict/batch", web::post().to(predict_batch))
        .route("/predict/batch/upload", web::post().to(predict_batch_upload))
        .route("/predict/batch/csv", web::post().to(predict_batch_csv))
        .route("/similar", web::post().to(similar))
        .route("/insights/importance", web::get().to(feature_importance))
        .route("/insights/trends/{feature}", web::get().to(price_trend))
        .route("/insights/stats", web::get().to(price_stats))
        .route("/insights/engineered", web::get().to(engineered))
        .route("/dataset/info", web::get().to(dataset_info))
        .route("/dataset/browse", web::get().to(browse))
        .route("/dataset/browse.csv", web::get().to(browse_csv))
        .route("/model/info", web::get().to(model_info))
        .route("/sessions", web::post().to(create_session))
        .route("/sessions/{id}", web::get().to(get_session))
        .route("/sessions/{id}", web::delete().to(delete_session))
        .route("/sessions/{id}/mode", web::put().to(set_session_mode))
        .route("/sessions/{id}/fields", web::put().to(set_session_fields))
        .route("/sessions/{id}/predict", web::post().to(session_predict))
        .route("/sessions/{id}/search", web::post().to(session_search))
        .route("/sessions/{id}/selected", web::put().to(session_select))
        .route("/sessions/{id}/similar", web::get().to(session_similar));
}

/// Time-of-day greeting for a local hour
pub fn greeting(hour: u32) -> &'static str {
    if hour < 12 {
        "Good Morning!"
    } else if hour < 18 {
        "Good Afternoon!"
    } else {
        "Good Evening!"
    }
}

fn csv_attachment(file_name: &str, body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ))
        .body(body)
}

/// Predict one record. Columns the record leaves out count as missing.
fn predict_record(model: &dyn PriceModel, record: &VehicleRecord) -> Result<f64, ApiError> {
    let mut columns: Vec<String> = record.columns().cloned().collect();
    columns.sort();
    for c in model.input_columns() {
        if !columns.contains(&c) {
            columns.push(c);
        }
    }
    let table = Table::from_records(&columns, vec![record.clone()]);
    model
        .predict(&table)?
        .first()
        .copied()
        .ok_or_else(|| ApiError::Model(ModelError::Invalid("model returned no prediction".into())))
}

fn similar_vehicle(resources: &Resources, record: &VehicleRecord) -> Result<SimilarVehicle, ApiError> {
    let nearest = resources.finder().nearest(record)?;
    Ok(SimilarVehicle {
        label: analytics::vehicle_label(&nearest.record),
        nearest,
    })
}

fn prediction_response(
    resources: &Resources,
    input: VehicleRecord,
    price: f64,
) -> PredictionResponse {
    let similar = similar_vehicle(resources, &input).ok();
    PredictionResponse {
        predicted_price: price,
        formatted_price: format!("${}", format_thousands(price, 2)),
        input,
        similar,
    }
}

fn batch_response(batch: &BatchPrediction) -> BatchResponse {
    BatchResponse {
        rows: batch.len(),
        preview: batch.preview().to_json_rows(),
        results: batch.results().to_json_rows(),
        insights: batch.insights(),
    }
}

fn session_not_found(id: &Uuid) -> ApiError {
    ApiError::NotFound(format!("Session {} not found", id))
}

async fn index() -> ActixResult<HttpResponse> {
    let now = chrono::Local::now();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "name": "carscope",
        "version": env!("CARGO_PKG_VERSION"),
        "greeting": greeting(now.hour()),
        "date": now.format("%d %B %Y").to_string(),
        "features": [
            "Single vehicle price prediction",
            "Batch price prediction from CSV uploads",
            "Similar vehicle lookup",
            "Dataset exploration and insights"
        ]
    })))
}

async fn health(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "dataset_rows": resources.dataset().len(),
        "model_loaded": resources.has_model()
    })))
}

async fn vehicle_options(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(resources.form_options()))
}

async fn search_vehicles(
    resources: web::Data<Arc<Resources>>,
    req: web::Json<VehicleFilter>,
) -> ActixResult<HttpResponse> {
    let vehicles = analytics::search(resources.dataset(), &req);
    debug!("Search matched {} vehicles", vehicles.len());
    Ok(HttpResponse::Ok().json(SearchResponse {
        count: vehicles.len(),
        vehicles,
    }))
}

async fn predict(
    resources: web::Data<Arc<Resources>>,
    req: web::Json<VehicleRecord>,
) -> ActixResult<HttpResponse> {
    let model = resources.model()?;
    let input = req.into_inner();
    let price = predict_record(model, &input)?;
    Ok(HttpResponse::Ok().json(prediction_response(&resources, input, price)))
}

async fn predict_batch(
    resources: web::Data<Arc<Resources>>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let model = resources.model()?;
    let batch = BatchPrediction::from_csv(model, &body).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(batch_response(&batch)))
}

async fn predict_batch_upload(
    resources: web::Data<Arc<Resources>>,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let model = resources.model()?;

    // first part of the form is the CSV file
    let mut csv: Option<Vec<u8>> = None;
    if let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            data.extend_from_slice(&chunk);
        }
        info!("Received batch upload ({} bytes)", data.len());
        csv = Some(data);
    }

    let csv = csv.ok_or_else(|| ApiError::BadRequest("No file in upload".to_string()))?;
    let batch = BatchPrediction::from_csv(model, &csv).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(batch_response(&batch)))
}

async fn predict_batch_csv(
    resources: web::Data<Arc<Resources>>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let model = resources.model()?;
    let batch = BatchPrediction::from_csv(model, &body).map_err(ApiError::from)?;
    let csv = batch.to_csv().map_err(ApiError::from)?;
    Ok(csv_attachment("batch_predictions.csv", csv))
}

async fn similar(
    resources: web::Data<Arc<Resources>>,
    req: web::Json<VehicleRecord>,
) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(similar_vehicle(&resources, &req)?))
}

async fn feature_importance(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    let model = resources.model()?;
    let importances = model.feature_importances().ok_or_else(|| {
        ApiError::NotFound("The loaded model does not report feature importances".to_string())
    })?;
    let entries: Vec<ImportanceEntry> = importances
        .into_iter()
        .map(|(feature, importance)| ImportanceEntry {
            feature,
            importance,
        })
        .collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({ "importances": entries })))
}

async fn price_trend(
    resources: web::Data<Arc<Resources>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let feature = path.into_inner();
    let groups = analytics::price_trend(resources.dataset(), &feature).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "feature": feature,
        "groups": groups
    })))
}

async fn price_stats(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    let stats = analytics::price_stats(resources.dataset()).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(stats))
}

async fn engineered(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(EngineeredInsights::compute_now(resources.dataset())))
}

async fn dataset_info(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(analytics::dataset_info(resources.dataset())))
}

async fn browse(
    resources: web::Data<Arc<Resources>>,
    query: web::Query<BrowseQuery>,
) -> ActixResult<HttpResponse> {
    let request = BrowseRequest::from(query.into_inner());
    let window = analytics::browse(resources.dataset(), &request).map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": window.len(),
        "columns": window.columns(),
        "rows": window.to_json_rows()
    })))
}

async fn browse_csv(
    resources: web::Data<Arc<Resources>>,
    query: web::Query<BrowseQuery>,
) -> ActixResult<HttpResponse> {
    let request = BrowseRequest::from(query.into_inner());
    let window = analytics::browse(resources.dataset(), &request).map_err(ApiError::from)?;
    let csv = window.to_csv_bytes().map_err(ApiError::from)?;
    Ok(csv_attachment("vehicle_data_preview.csv", csv))
}

async fn model_info(resources: web::Data<Arc<Resources>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(resources.model_info()))
}

async fn create_session(sessions: web::Data<Arc<SessionStore>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Created().json(sessions.create()))
}

async fn get_session(
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let session = sessions.get(&id).ok_or_else(|| session_not_found(&id))?;
    Ok(HttpResponse::Ok().json(session))
}

async fn delete_session(
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    if !sessions.remove(&id) {
        return Err(session_not_found(&id).into());
    }
    Ok(HttpResponse::NoContent().finish())
}

async fn set_session_mode(
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
    req: web::Json<ModeRequest>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let update = sessions
        .update(&id, |s| SessionUpdate {
            cleared: s.set_mode(req.mode),
            session: s.clone(),
        })
        .ok_or_else(|| session_not_found(&id))?;
    Ok(HttpResponse::Ok().json(update))
}

async fn set_session_fields(
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
    req: web::Json<FieldsRequest>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let fields = req.into_inner().fields;
    let update = sessions
        .update(&id, |s| {
            let mut cleared = false;
            for (key, value) in fields {
                cleared |= s.observe_field(&key, value);
            }
            SessionUpdate {
                cleared,
                session: s.clone(),
            }
        })
        .ok_or_else(|| session_not_found(&id))?;
    Ok(HttpResponse::Ok().json(update))
}

async fn session_predict(
    resources: web::Data<Arc<Resources>>,
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
    req: web::Json<VehicleRecord>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    if sessions.get(&id).is_none() {
        return Err(session_not_found(&id).into());
    }
    let model = resources.model()?;
    let input = req.into_inner();
    let price = predict_record(model, &input)?;

    let stored = input.clone();
    sessions
        .update(&id, move |s| s.record_prediction(stored, price))
        .ok_or_else(|| session_not_found(&id))?;
    Ok(HttpResponse::Ok().json(prediction_response(&resources, input, price)))
}

async fn session_search(
    resources: web::Data<Arc<Resources>>,
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
    req: web::Json<VehicleFilter>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let vehicles = analytics::search(resources.dataset(), &req);
    let indices: Vec<usize> = vehicles.iter().map(|v| v.index).collect();
    let selected = sessions
        .update(&id, |s| {
            s.record_search(indices);
            s.selected_car
        })
        .ok_or_else(|| session_not_found(&id))?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "count": vehicles.len(),
        "vehicles": vehicles,
        "selected_car": selected
    })))
}

async fn session_select(
    resources: web::Data<Arc<Resources>>,
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
    req: web::Json<SelectRequest>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let found = sessions
        .update(&id, |s| s.select_car(req.index))
        .ok_or_else(|| session_not_found(&id))?;
    if !found {
        return Err(ApiError::BadRequest(format!(
            "Row {} is not among the session's search results",
            req.index
        ))
        .into());
    }
    let record = resources
        .dataset()
        .row(req.index)
        .ok_or_else(|| ApiError::NotFound(format!("Row {} not found", req.index)))?;
    Ok(HttpResponse::Ok().json(VehicleMatch {
        index: req.index,
        label: analytics::vehicle_label(record),
        record: record.clone(),
    }))
}

async fn session_similar(
    resources: web::Data<Arc<Resources>>,
    sessions: web::Data<Arc<SessionStore>>,
    path: web::Path<Uuid>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    let session = sessions.get(&id).ok_or_else(|| session_not_found(&id))?;
    let input = session
        .input
        .ok_or_else(|| ApiError::BadRequest("Session has no prediction input".to_string()))?;
    Ok(HttpResponse::Ok().json(similar_vehicle(&resources, &input)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test::{
        call_and_read_body, call_and_read_body_json, call_service, init_service, read_body,
        read_body_json, TestRequest,
    };
    use carscope_core::Dataset;
    use carscope_features::{FeatureSchema, Preprocessor};
    use carscope_model::{RegressionTree, TreeModel, TreeNode};
    use serde_json::{json, Value};
    use std::path::Path;

    const DATASET: &str = "make,model,year,price,mileage,cylinders,doors,fuel,body,description\n\
        Toyota,Camry,2020,20000,30,4,4,Gasoline,Sedan,Clean one owner\n\
        Ford,F-150,2015,12000,80,6,2,Gasoline,Pickup,Tow package\n\
        BMW,X5,2022,61000,20,6,4,Gasoline,SUV,Luxury package\n";

    fn dataset() -> Dataset {
        Dataset::from_table(Table::from_csv_bytes(DATASET.as_bytes()).unwrap()).unwrap()
    }

    /// Splits on standardized year: older than 2019 → 15000, newer → 40000
    fn model() -> TreeModel {
        let pre = Preprocessor::new(FeatureSchema::new(["year", "mileage"], ["make"]))
            .fit(dataset().table())
            .unwrap();
        let tree = RegressionTree::new(
            5,
            TreeNode::Split {
                feature_idx: 0,
                threshold: 0.0,
                left: Box::new(TreeNode::Leaf {
                    value: 15000.0,
                    n_samples: 1,
                    impurity: 0.0,
                }),
                right: Box::new(TreeNode::Leaf {
                    value: 40000.0,
                    n_samples: 2,
                    impurity: 0.0,
                }),
                n_samples: 3,
                impurity: 1.0,
            },
        );
        TreeModel::new(pre, tree).unwrap()
    }

    fn resources(with_model: bool) -> Arc<Resources> {
        let model: Option<Arc<dyn PriceModel>> = if with_model {
            Some(Arc::new(model()))
        } else {
            None
        };
        Arc::new(Resources::new(dataset(), model, Path::new("unused.json")))
    }

    macro_rules! app {
        ($resources:expr, $sessions:expr) => {
            init_service(
                App::new()
                    .app_data(web::Data::new($resources))
                    .app_data(web::Data::new($sessions))
                    .configure(configure),
            )
            .await
        };
        ($resources:expr) => {
            app!($resources, Arc::new(SessionStore::new()))
        };
    }

    #[test]
    fn test_greeting_by_hour() {
        assert_eq!(greeting(0), "Good Morning!");
        assert_eq!(greeting(11), "Good Morning!");
        assert_eq!(greeting(12), "Good Afternoon!");
        assert_eq!(greeting(17), "Good Afternoon!");
        assert_eq!(greeting(18), "Good Evening!");
        assert_eq!(greeting(23), "Good Evening!");
    }

    #[actix_web::test]
    async fn test_health() {
        let app = app!(resources(true));
        let req = TestRequest::get().uri("/health").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["dataset_rows"], 3);
        assert_eq!(body["model_loaded"], true);
    }

    #[actix_web::test]
    async fn test_predict_with_similar_vehicle() {
        let app = app!(resources(true));
        let req = TestRequest::post()
            .uri("/predict")
            .set_json(json!({"make": "Toyota", "year": 2021, "mileage": 25, "cylinders": 4, "doors": 4}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["predicted_price"], 40000.0);
        assert_eq!(body["formatted_price"], "$40,000.00");
        assert_eq!(body["similar"]["index"], 0);
        assert_eq!(body["similar"]["label"], "2020 Toyota Camry - $20,000");
        assert_eq!(body["similar"]["comparison"][1]["contribution"], 25.0);
    }

    #[actix_web::test]
    async fn test_partial_input_is_imputed() {
        let app = app!(resources(true));
        let req = TestRequest::post()
            .uri("/predict")
            .set_json(json!({"year": 2016}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["predicted_price"], 15000.0);
    }

    #[actix_web::test]
    async fn test_model_endpoints_without_model() {
        let app = app!(resources(false));
        for (method, uri) in [
            ("POST", "/predict"),
            ("POST", "/predict/batch"),
            ("GET", "/insights/importance"),
        ] {
            let req = if method == "POST" {
                TestRequest::post()
                    .uri(uri)
                    .set_json(json!({"year": 2020}))
                    .to_request()
            } else {
                TestRequest::get().uri(uri).to_request()
            };
            let resp = call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        }

        // everything else keeps working
        let req = TestRequest::post()
            .uri("/similar")
            .set_json(json!({"year": 2015, "mileage": 80, "cylinders": 6, "doors": 2}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["index"], 1);
        assert_eq!(body["distance"], 0.0);

        let req = TestRequest::get().uri("/model/info").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["loaded"], false);
    }

    #[actix_web::test]
    async fn test_batch_json_and_csv() {
        let app = app!(resources(true));
        let csv = "year,mileage,make\n2016,50,Ford\n2021,10,BMW\n";

        let req = TestRequest::post()
            .uri("/predict/batch")
            .set_payload(csv)
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"], 2);
        assert_eq!(body["results"][0]["Predicted_price"], "15000.00");
        assert_eq!(body["results"][1]["Predicted_price"], "40000.00");
        assert_eq!(body["insights"]["avg_price_by_make"][0]["group"], "Ford");

        let req = TestRequest::post()
            .uri("/predict/batch/csv")
            .set_payload(csv)
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("batch_predictions.csv"));
        let body = read_body(resp).await;
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "year,mileage,make,Predicted_price\n2016,50,Ford,15000.00\n2021,10,BMW,40000.00\n"
        );
    }

    #[actix_web::test]
    async fn test_batch_errors() {
        let app = app!(resources(true));

        let req = TestRequest::post()
            .uri("/predict/batch")
            .set_payload("color\nRed\n")
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("year"));

        let req = TestRequest::post()
            .uri("/predict/batch")
            .set_payload(&b"year,mileage,make\n\xff\xfe,1,Ford\n"[..])
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_batch_upload_multipart() {
        let app = app!(resources(true));
        let boundary = "carscopeboundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cars.csv\"\r\n\
             Content-Type: text/csv\r\n\r\nyear,mileage,make\n2016,50,Ford\n\r\n--{b}--\r\n",
            b = boundary
        );
        let req = TestRequest::post()
            .uri("/predict/batch/upload")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["rows"], 1);
    }

    #[actix_web::test]
    async fn test_search_and_options() {
        let app = app!(resources(true));
        let req = TestRequest::post()
            .uri("/vehicles/search")
            .set_json(json!({"brand": "All", "min_price": 15000, "description_query": "PACKAGE"}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["vehicles"][0]["label"], "2022 BMW X5 - $61,000");

        let req = TestRequest::get().uri("/vehicles/options").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["makes"], json!(["BMW", "Ford", "Toyota"]));
    }

    #[actix_web::test]
    async fn test_insights() {
        let app = app!(resources(true));

        let req = TestRequest::get().uri("/insights/importance").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["importances"][0]["feature"], "year");
        assert_eq!(body["importances"][0]["importance"], 1.0);

        let req = TestRequest::get().uri("/insights/trends/make").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["groups"][0]["group"], "Ford");
        assert_eq!(body["groups"][2]["group"], "BMW");

        let req = TestRequest::get().uri("/insights/trends/trim").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::get().uri("/insights/stats").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["50%"], 20000.0);

        let req = TestRequest::get().uri("/insights/engineered").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["luxury_split"]["luxury"], 61000.0);
    }

    #[actix_web::test]
    async fn test_browse() {
        let app = app!(resources(true));
        let req = TestRequest::get()
            .uri("/dataset/browse?search=pickup&columns=make,price")
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["columns"], json!(["make", "price"]));
        assert_eq!(body["rows"][0]["make"], "Ford");

        let req = TestRequest::get()
            .uri("/dataset/browse.csv?start=1&end=2&columns=model")
            .to_request();
        let body = call_and_read_body(&app, req).await;
        assert_eq!(std::str::from_utf8(&body).unwrap(), "model\nF-150\n");

        let req = TestRequest::get()
            .uri("/dataset/browse?start=2&end=1")
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::get()
            .uri("/dataset/browse?start=18446744073709551615")
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = read_body_json(resp).await;
        assert_eq!(body["count"], 0);

        let req = TestRequest::get().uri("/dataset/info").to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["rows"], 3);
        assert_eq!(body["column_info"][0]["dtype"], "object");
        assert_eq!(body["column_info"][2]["dtype"], "float64");
    }

    #[actix_web::test]
    async fn test_session_flow() {
        let sessions = Arc::new(SessionStore::new());
        let app = app!(resources(true), sessions.clone());

        let req = TestRequest::post().uri("/sessions").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = read_body_json(resp).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = TestRequest::put()
            .uri(&format!("/sessions/{}/mode", id))
            .set_json(json!({"mode": "full"}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["cleared"], false);

        let req = TestRequest::post()
            .uri(&format!("/sessions/{}/predict", id))
            .set_json(json!({"make": "Toyota", "year": 2021, "mileage": 25}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["predicted_price"], 40000.0);

        let req = TestRequest::get()
            .uri(&format!("/sessions/{}/similar", id))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["index"], 0);

        // same value keeps the prediction, a new one clears it
        let req = TestRequest::put()
            .uri(&format!("/sessions/{}/fields", id))
            .set_json(json!({"fields": {"make": "Toyota"}}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["cleared"], false);
        assert_eq!(body["session"]["predicted_price"], 40000.0);

        let req = TestRequest::put()
            .uri(&format!("/sessions/{}/fields", id))
            .set_json(json!({"fields": {"make": "Ford"}}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["cleared"], true);
        assert_eq!(body["session"]["predicted_price"], Value::Null);

        let req = TestRequest::get()
            .uri(&format!("/sessions/{}/similar", id))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(sessions.len(), 1);
    }

    #[actix_web::test]
    async fn test_session_search_and_select() {
        let app = app!(resources(true));
        let req = TestRequest::post().uri("/sessions").to_request();
        let created: Value = call_and_read_body_json(&app, req).await;
        let id = created["id"].as_str().unwrap().to_string();

        let req = TestRequest::post()
            .uri(&format!("/sessions/{}/search", id))
            .set_json(json!({"max_price": 30000}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 2);
        assert_eq!(body["selected_car"], 0);

        let req = TestRequest::put()
            .uri(&format!("/sessions/{}/selected", id))
            .set_json(json!({"index": 1}))
            .to_request();
        let body: Value = call_and_read_body_json(&app, req).await;
        assert_eq!(body["label"], "2015 Ford F-150 - $12,000");

        let req = TestRequest::put()
            .uri(&format!("/sessions/{}/selected", id))
            .set_json(json!({"index": 2}))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_session() {
        let app = app!(resources(true));
        let req = TestRequest::get()
            .uri(&format!("/sessions/{}", Uuid::new_v4()))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_delete_session() {
        let app = app!(resources(true));
        let req = TestRequest::post().uri("/sessions").to_request();
        let created: Value = call_and_read_body_json(&app, req).await;
        let uri = format!("/sessions/{}", created["id"].as_str().unwrap());

        let req = TestRequest::delete().uri(&uri).to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::delete().uri(&uri).to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
