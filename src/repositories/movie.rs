use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::cache::Cache;
use crate::models::{Genre, Movie};
use crate::utils::error::AppError;

/// Fixed page size for every catalog listing.
pub const PAGE_SIZE: i64 = 12;

/// Listing page bodies and the genre list live for one hour; admin writes
/// become visible only after expiry (accepted staleness trade-off, catalog
/// writes are rare).
const CACHE_TTL_SECS: u64 = 3600;

const GENRES_CACHE_KEY: &str = "genres:all";

/// Which curated listing a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Upcoming,
    Popular,
}

pub fn page_cache_key(kind: ListingKind, page: i64) -> String {
    match kind {
        ListingKind::Upcoming => format!("movies:upcoming:page:{}", page),
        ListingKind::Popular => format!("movies:popular:page:{}", page),
    }
}

const UPCOMING_PAGE_SQL: &str = "\
    SELECT m.id, m.title, m.overview, m.director_name, m.duration, m.popularity,
           m.release_date, m.poster_path, m.backdrop_path, m.created_at, m.updated_at,
           COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', g.id, 'name', g.name))
                    FILTER (WHERE g.id IS NOT NULL), '[]') AS genres,
           COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', c.id, 'name', c.name))
                    FILTER (WHERE c.id IS NOT NULL), '[]') AS casts
    FROM movies m
    LEFT JOIN movies_genres mg ON mg.movies_id = m.id
    LEFT JOIN genres g ON g.id = mg.genres_id
    LEFT JOIN movies_casts mc ON mc.movies_id = m.id
    LEFT JOIN casts c ON c.id = mc.casts_id
    WHERE m.deleted_at IS NULL AND m.release_date > NOW()
    GROUP BY m.id
    ORDER BY m.release_date ASC
    LIMIT $1 OFFSET $2";

const POPULAR_PAGE_SQL: &str = "\
    SELECT m.id, m.title, m.overview, m.director_name, m.duration, m.popularity,
           m.release_date, m.poster_path, m.backdrop_path, m.created_at, m.updated_at,
           COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', g.id, 'name', g.name))
                    FILTER (WHERE g.id IS NOT NULL), '[]') AS genres,
           COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', c.id, 'name', c.name))
                    FILTER (WHERE c.id IS NOT NULL), '[]') AS casts
    FROM movies m
    LEFT JOIN movies_genres mg ON mg.movies_id = m.id
    LEFT JOIN genres g ON g.id = mg.genres_id
    LEFT JOIN movies_casts mc ON mc.movies_id = m.id
    LEFT JOIN casts c ON c.id = mc.casts_id
    WHERE m.deleted_at IS NULL
    GROUP BY m.id
    ORDER BY m.popularity DESC
    LIMIT $1 OFFSET $2";

const MOVIE_DETAIL_SQL: &str = "\
    SELECT m.id, m.title, m.overview, m.director_name, m.duration, m.popularity,
           m.release_date, m.poster_path, m.backdrop_path, m.created_at, m.updated_at,
           COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', g.id, 'name', g.name))
                    FILTER (WHERE g.id IS NOT NULL), '[]') AS genres,
           COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', c.id, 'name', c.name))
                    FILTER (WHERE c.id IS NOT NULL), '[]') AS casts
    FROM movies m
    LEFT JOIN movies_genres mg ON mg.movies_id = m.id
    LEFT JOIN genres g ON g.id = mg.genres_id
    LEFT JOIN movies_casts mc ON mc.movies_id = m.id
    LEFT JOIN casts c ON c.id = mc.casts_id
    WHERE m.id = $1 AND m.deleted_at IS NULL
    GROUP BY m.id";

/// Catalog reads. Curated listing pages and the genre list go through the
/// cache. Only the page body is cached; the total count is always recomputed
/// live, so a hit can pair a stale body with a fresh count. Search and detail
/// hit Postgres directly.
#[derive(Clone)]
pub struct MovieRepository {
    db: PgPool,
    cache: Cache,
}

impl MovieRepository {
    pub fn new(db: PgPool, cache: Cache) -> Self {
        Self { db, cache }
    }

    pub async fn listing_page(
        &self,
        kind: ListingKind,
        page: i64,
    ) -> Result<(Vec<Movie>, i64), AppError> {
        let total = self.listing_total(kind).await?;

        let key = page_cache_key(kind, page);
        if let Some(cached) = self.cache.get_json::<Vec<Movie>>(&key).await {
            tracing::debug!(key, "catalog page served from cache");
            return Ok((cached, total));
        }

        let sql = match kind {
            ListingKind::Upcoming => UPCOMING_PAGE_SQL,
            ListingKind::Popular => POPULAR_PAGE_SQL,
        };
        let rows = sqlx::query(sql)
            .bind(PAGE_SIZE)
            .bind((page - 1) * PAGE_SIZE)
            .fetch_all(&self.db)
            .await?;

        let movies = rows
            .iter()
            .map(Movie::from_aggregated_row)
            .collect::<Result<Vec<_>, _>>()?;

        self.cache.set_json(&key, &movies, CACHE_TTL_SECS).await;

        Ok((movies, total))
    }

    async fn listing_total(&self, kind: ListingKind) -> Result<i64, AppError> {
        let sql = match kind {
            ListingKind::Upcoming => {
                "SELECT COUNT(*) FROM movies WHERE deleted_at IS NULL AND release_date > NOW()"
            }
            ListingKind::Popular => "SELECT COUNT(*) FROM movies WHERE deleted_at IS NULL",
        };
        let total: i64 = sqlx::query_scalar(sql).fetch_one(&self.db).await?;
        Ok(total)
    }

    /// Filtered catalog search. Not cached: the (search, genre, page) key
    /// space is unbounded.
    pub async fn search(
        &self,
        page: i64,
        search: Option<&str>,
        genre_id: Option<i32>,
    ) -> Result<(Vec<Movie>, i64), AppError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let pattern = search.map(|s| format!("%{}%", s));

        let mut count_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(DISTINCT m.id) FROM movies m WHERE m.deleted_at IS NULL",
        );
        if let Some(pattern) = &pattern {
            count_query
                .push(" AND (m.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR m.overview ILIKE ")
                .push_bind(pattern.clone())
                .push(")");
        }
        if let Some(genre_id) = genre_id {
            count_query
                .push(" AND EXISTS (SELECT 1 FROM movies_genres mg2 WHERE mg2.movies_id = m.id AND mg2.genres_id = ")
                .push_bind(genre_id)
                .push(")");
        }
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.db)
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT m.id, m.title, m.overview, m.director_name, m.duration, m.popularity, \
             m.release_date, m.poster_path, m.backdrop_path, m.created_at, m.updated_at, \
             COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', g.id, 'name', g.name)) \
                      FILTER (WHERE g.id IS NOT NULL), '[]') AS genres, \
             COALESCE(jsonb_agg(DISTINCT jsonb_build_object('id', c.id, 'name', c.name)) \
                      FILTER (WHERE c.id IS NOT NULL), '[]') AS casts \
             FROM movies m \
             LEFT JOIN movies_genres mg ON mg.movies_id = m.id \
             LEFT JOIN genres g ON g.id = mg.genres_id \
             LEFT JOIN movies_casts mc ON mc.movies_id = m.id \
             LEFT JOIN casts c ON c.id = mc.casts_id \
             WHERE m.deleted_at IS NULL",
        );
        if let Some(pattern) = &pattern {
            query
                .push(" AND (m.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR m.overview ILIKE ")
                .push_bind(pattern.clone())
                .push(")");
        }
        if let Some(genre_id) = genre_id {
            query
                .push(" AND EXISTS (SELECT 1 FROM movies_genres mg2 WHERE mg2.movies_id = m.id AND mg2.genres_id = ")
                .push_bind(genre_id)
                .push(")");
        }
        query
            .push(" GROUP BY m.id ORDER BY m.release_date DESC LIMIT ")
            .push_bind(PAGE_SIZE)
            .push(" OFFSET ")
            .push_bind((page - 1) * PAGE_SIZE);

        let rows = query.build().fetch_all(&self.db).await?;
        let movies = rows
            .iter()
            .map(Movie::from_aggregated_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((movies, total))
    }

    /// Single movie with nested genres and casts. Soft-deleted movies are not
    /// addressable through the catalog.
    pub async fn detail(&self, id: i32) -> Result<Movie, AppError> {
        let row = sqlx::query(MOVIE_DETAIL_SQL)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Movie with id {} was not found", id)))?;

        Ok(Movie::from_aggregated_row(&row)?)
    }

    pub async fn all_genres(&self) -> Result<Vec<Genre>, AppError> {
        if let Some(cached) = self.cache.get_json::<Vec<Genre>>(GENRES_CACHE_KEY).await {
            return Ok(cached);
        }

        let genres = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name ASC")
            .fetch_all(&self.db)
            .await?;

        self.cache
            .set_json(GENRES_CACHE_KEY, &genres, CACHE_TTL_SECS)
            .await;

        Ok(genres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_cache_keys_follow_persisted_layout() {
        assert_eq!(
            page_cache_key(ListingKind::Upcoming, 1),
            "movies:upcoming:page:1"
        );
        assert_eq!(
            page_cache_key(ListingKind::Popular, 4),
            "movies:popular:page:4"
        );
        assert_eq!(GENRES_CACHE_KEY, "genres:all");
    }
}
