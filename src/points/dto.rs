use serde::{Deserialize, Serialize};

use super::repo_types::PointEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddPointRequest {
    pub user_id: Option<i64>,
    pub point: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryQuery {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPointResponse {
    pub message: &'static str,
    pub entry: PointEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub user_id: i64,
    pub nick_name: String,
    pub total_points: i64,
    pub entries: Vec<PointEntry>,
}
