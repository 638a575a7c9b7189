//! 地理坐标
//!
//! 对外以 GeoJSON Point 形式序列化：`{"type": "Point", "coordinates": [lng, lat]}`。

use serde::{Deserialize, Serialize};

use crate::error::{CoordinationError, Result};

/// 地球平均半径（米）
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// 经纬度坐标点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "GeoJsonPoint", try_from = "GeoJsonPoint")]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Result<Self> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(CoordinationError::Validation(
                "坐标必须是有限数值".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinationError::Validation(format!(
                "坐标超出范围: [{lng}, {lat}]"
            )));
        }
        Ok(Self { lng, lat })
    }

    /// 从 `[lng, lat]` 数组构造，长度必须为 2
    pub fn from_coordinates(coordinates: &[f64]) -> Result<Self> {
        match coordinates {
            [lng, lat] => Self::new(*lng, *lat),
            _ => Err(CoordinationError::Validation(format!(
                "坐标必须是 [经度, 纬度] 两个数值，实际收到 {} 个",
                coordinates.len()
            ))),
        }
    }

    pub fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// 球面距离（米），haversine 公式
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<f64>,
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: point.coordinates().to_vec(),
        }
    }
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = CoordinationError;

    fn try_from(value: GeoJsonPoint) -> Result<Self> {
        if value.kind != "Point" {
            return Err(CoordinationError::Validation(format!(
                "不支持的几何类型: {}",
                value.kind
            )));
        }
        GeoPoint::from_coordinates(&value.coordinates)
    }
}
