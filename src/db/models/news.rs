use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub cover_image_url: Option<String>,
    pub published: bool,
    pub author_id: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
