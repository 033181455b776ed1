use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CastMember {
    pub id: i32,
    pub name: String,
}

/// A catalog movie with its aggregated genre and cast lists.
///
/// Rows come out of a grouped jsonb_agg query, so hydration is manual rather
/// than via `FromRow` (the nested lists arrive as a single jsonb column each).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub overview: String,
    pub director_name: String,
    pub duration: i32,
    pub popularity: f64,
    pub release_date: NaiveDate,
    pub poster_path: String,
    pub backdrop_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub genres: Vec<Genre>,
    pub casts: Vec<CastMember>,
}

impl Movie {
    pub fn from_aggregated_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let genres: serde_json::Value = row.try_get("genres")?;
        let casts: serde_json::Value = row.try_get("casts")?;

        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            overview: row.try_get("overview")?,
            director_name: row.try_get("director_name")?,
            duration: row.try_get("duration")?,
            popularity: row.try_get("popularity")?,
            release_date: row.try_get("release_date")?,
            poster_path: row.try_get("poster_path")?,
            backdrop_path: row.try_get("backdrop_path")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            genres: serde_json::from_value(genres).unwrap_or_default(),
            casts: serde_json::from_value(casts).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_round_trips_through_cache_serialization() {
        let movie = Movie {
            id: 7,
            title: "Arrival".to_string(),
            overview: "A linguist decodes an alien language".to_string(),
            director_name: "Denis Villeneuve".to_string(),
            duration: 116,
            popularity: 83.5,
            release_date: NaiveDate::from_ymd_opt(2016, 11, 11).unwrap(),
            poster_path: "/arrival.jpg".to_string(),
            backdrop_path: "/arrival_bg.jpg".to_string(),
            created_at: Utc::now(),
            updated_at: None,
            genres: vec![Genre {
                id: 1,
                name: "Sci-Fi".to_string(),
            }],
            casts: vec![CastMember {
                id: 2,
                name: "Amy Adams".to_string(),
            }],
        };

        let raw = serde_json::to_string(&movie).unwrap();
        let back: Movie = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.id, movie.id);
        assert_eq!(back.genres.len(), 1);
        assert_eq!(back.casts[0].name, "Amy Adams");
    }
}
