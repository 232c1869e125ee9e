use std::str::FromStr;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use super::repo_types::MenuRow;
use crate::{error::AppError, extract::AppQuery, state::AppState};

/// Campus cafeterias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restaurant {
    Gyo,
    Bi,
    Gick,
}

impl Restaurant {
    pub fn as_str(self) -> &'static str {
        match self {
            Restaurant::Gyo => "gyo",
            Restaurant::Bi => "bi",
            Restaurant::Gick => "gick",
        }
    }
}

impl FromStr for Restaurant {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gyo" => Ok(Restaurant::Gyo),
            "bi" => Ok(Restaurant::Bi),
            "gick" => Ok(Restaurant::Gick),
            other => Err(AppError::validation(format!(
                "restaurantType must be one of gyo, bi, gick (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MenuQuery {
    pub restaurant_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub restaurant_type: String,
    pub day_of_week: String,
    pub meal_time: String,
    pub dishes: String,
    pub date: String, // YYYY-MM-DD
}

impl From<MenuRow> for MenuItem {
    fn from(r: MenuRow) -> Self {
        Self {
            restaurant_type: r.restaurant_type,
            day_of_week: r.day_of_week,
            meal_time: r.meal_time,
            dishes: r.dishes,
            date: r.date.to_string(),
        }
    }
}

pub fn menu_routes() -> Router<AppState> {
    Router::new().route("/menu", get(todays_menu))
}

/// Today's (UTC) menus for one cafeteria.
#[instrument(skip(state))]
pub async fn todays_menu(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<MenuQuery>,
) -> Result<Json<Vec<MenuItem>>, AppError> {
    let restaurant: Restaurant = q
        .restaurant_type
        .as_deref()
        .ok_or_else(|| AppError::validation("missing required query parameter: restaurantType"))?
        .parse()?;
    let today = OffsetDateTime::now_utc().date();

    let rows = state.store.menus_for(restaurant.as_str(), today).await?;
    debug!(restaurant = restaurant.as_str(), count = rows.len(), "menus fetched");
    Ok(Json(rows.into_iter().map(MenuItem::from).collect()))
}
