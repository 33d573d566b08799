use serde::{Deserialize, Serialize};

use crate::RecordUpdate;

#[derive(Debug, Serialize)]
pub struct BatchUpdateBody<'a> {
    pub inputs: &'a [RecordUpdate],
}

/// Payload of the official-rate endpoint. Only the fields we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePayload {
    pub venta: f64,
    pub fecha_actualizacion: String,
}
