use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use serde_with;

pub mod coordinate;
pub mod route;
pub mod shipment;
pub mod surface;
pub mod token;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithDistance<T> {
    pub distance_km: f64,
    #[serde(flatten)]
    pub content: T,
}

impl<T> WithDistance<T> {
    pub fn new(distance_km: f64, content: T) -> Self {
        Self {
            distance_km,
            content,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> WithDistance<U> {
        WithDistance::new(self.distance_km, f(self.content))
    }
}

/// Sorts nearest first. NaN distances end up last.
pub fn sort_nearest_first<T>(values: &mut [WithDistance<T>]) {
    values.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or_else(|| a.distance_km.is_nan().cmp(&b.distance_km.is_nan()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_nearest_first() {
        let mut values = vec![
            WithDistance::new(3.0, "c"),
            WithDistance::new(f64::NAN, "x"),
            WithDistance::new(1.0, "a"),
            WithDistance::new(2.0, "b"),
        ];
        sort_nearest_first(&mut values);
        let order = values.iter().map(|v| v.content).collect::<Vec<_>>();
        assert_eq!(order, vec!["a", "b", "c", "x"]);
    }

    #[test]
    fn serializes_distance_next_to_content() {
        #[derive(Serialize)]
        struct Named {
            name: &'static str,
        }
        let json = serde_json::to_value(WithDistance::new(1.5, Named { name: "a" }))
            .unwrap();
        assert_eq!(json["distanceKm"], 1.5);
        assert_eq!(json["name"], "a");
    }
}
