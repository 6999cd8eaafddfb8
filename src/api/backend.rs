//! Backend port
//!
//! The five operations the session controller needs from the analysis service.

use async_trait::async_trait;

use super::client::ApiResult;
use crate::models::{
    AnalyzeResponse, MealImage, MealRecord, NutrientReport, Patient, Recommendation,
};

/// Remote analysis service
#[async_trait]
pub trait NutritionBackend: Send + Sync + 'static {
    /// `GET /users`
    async fn list_patients(&self) -> ApiResult<Vec<Patient>>;

    /// `GET /report/{user_id}`, optionally scoped with `?meal_id=`
    async fn get_report(&self, user_id: i64, meal_id: Option<i64>) -> ApiResult<NutrientReport>;

    /// `GET /recommendations/{user_id}`
    async fn get_recommendations(&self, user_id: i64) -> ApiResult<Vec<Recommendation>>;

    /// `GET /history/{user_id}`
    async fn get_history(&self, user_id: i64) -> ApiResult<Vec<MealRecord>>;

    /// `POST /analyze` as multipart `file` + `user_id`
    async fn analyze_meal(
        &self,
        user_id: i64,
        image: &MealImage,
        bytes: Vec<u8>,
    ) -> ApiResult<AnalyzeResponse>;
}
