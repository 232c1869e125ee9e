use sqlx::FromRow;
use time::Date;

#[derive(Debug, Clone, FromRow)]
pub struct MenuRow {
    pub restaurant_type: String,
    pub day_of_week: String,
    pub meal_time: String,
    pub dishes: String,
    pub date: Date,
}
