//! Shape-tolerant decoding of Umami response bodies.
//!
//! Different Umami releases answer the same endpoint with different JSON
//! layouts. Each decoder here tries the primary layout first and, only when the
//! body is well-formed JSON of the wrong shape, tries the alternate one. If
//! neither matches, the error from the first attempt is returned.

use super::models::{MetricPoint, PageViewPoint, Stats, Website};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Tries `A`, then `B` on a structural mismatch, normalizing both into `T`.
fn decode_either<A, B, T>(
    body: &[u8],
    from_primary: impl FnOnce(A) -> T,
    from_alternate: impl FnOnce(B) -> T,
) -> Result<T, serde_json::Error>
where
    A: DeserializeOwned,
    B: DeserializeOwned,
{
    match serde_json::from_slice::<A>(body) {
        Ok(primary) => Ok(from_primary(primary)),
        Err(err) if err.is_data() => serde_json::from_slice::<B>(body)
            .map(from_alternate)
            .map_err(|_| err),
        Err(err) => Err(err),
    }
}

/// `GET /api/websites` answers `{"data": [...]}`.
pub fn decode_websites(body: &[u8]) -> Result<Vec<Website>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Envelope {
        #[serde(default)]
        data: Vec<Website>,
    }

    serde_json::from_slice::<Envelope>(body).map(|envelope| envelope.data)
}

/// Each counter may be an object or a bare number, see [`super::models::ValueChange`].
pub fn decode_stats(body: &[u8]) -> Result<Stats, serde_json::Error> {
    serde_json::from_slice(body)
}

/// `{"pageviews": [...], "sessions": [...]}` or a bare array of points.
pub fn decode_page_views(body: &[u8]) -> Result<Vec<PageViewPoint>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Series {
        #[serde(default)]
        pageviews: Vec<PageViewPoint>,
    }

    decode_either(
        body,
        |series: Series| series.pageviews,
        |points: Vec<PageViewPoint>| points,
    )
}

/// Only a bare array is accepted. A `{"data": [...]}` wrapper is an error,
/// unlike page views.
pub fn decode_metrics(body: &[u8]) -> Result<Vec<MetricPoint>, serde_json::Error> {
    serde_json::from_slice(body)
}

/// An array of `{x, y}` points, or a single `{x}` object holding the count.
pub fn decode_active(body: &[u8]) -> Result<Vec<MetricPoint>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Point {
        #[serde(default)]
        x: i64,
        #[serde(default)]
        y: i64,
    }

    #[derive(Deserialize)]
    struct Single {
        #[serde(default)]
        x: i64,
    }

    decode_either(
        body,
        |points: Vec<Point>| {
            points
                .into_iter()
                .map(|p| MetricPoint::new(p.x.to_string(), p.y))
                .collect()
        },
        |single: Single| vec![MetricPoint::new(single.x.to_string(), single.x)],
    )
}
