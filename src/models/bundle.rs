// src/models/bundle.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Row};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::inbound::TargetLocator;

/// Dono de um bundle: ou o inbound, ou o lote (antes da confirmação). Nunca os dois.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum BundleParent {
    Inbound(i64),
    Lot(i64),
}

impl BundleParent {
    /// Converte o par de colunas anuláveis do banco; `None` se ambas ou nenhuma vierem preenchidas.
    pub fn from_columns(inbound_id: Option<i64>, lot_id: Option<i64>) -> Option<Self> {
        match (inbound_id, lot_id) {
            (Some(id), None) => Some(BundleParent::Inbound(id)),
            (None, Some(id)) => Some(BundleParent::Lot(id)),
            _ => None,
        }
    }

    pub fn inbound_id(self) -> Option<i64> {
        match self {
            BundleParent::Inbound(id) => Some(id),
            BundleParent::Lot(_) => None,
        }
    }

    pub fn lot_id(self) -> Option<i64> {
        match self {
            BundleParent::Lot(id) => Some(id),
            BundleParent::Inbound(_) => None,
        }
    }

    pub fn label(self) -> String {
        match self {
            BundleParent::Inbound(id) => format!("inbound {id}"),
            BundleParent::Lot(id) => format!("lote {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub bundle_id: i64,
    pub parent: BundleParent,
    #[schema(example = 1)]
    pub bundle_no: i32,
    #[schema(example = "1012.5")]
    pub weight: Decimal,
    pub melt_no: Option<String>,
    pub is_outbounded: bool,
    pub is_repacked: bool,
    pub before_photo: Option<String>,
    pub after_photo: Option<String>,
    pub created_at: DateTime<Utc>,
}

// FromRow manual: o derive não sabe montar o `parent` a partir de duas colunas.
impl<'r> FromRow<'r, PgRow> for Bundle {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let inbound_id: Option<i64> = row.try_get("inbound_id")?;
        let lot_id: Option<i64> = row.try_get("lot_id")?;
        let parent = BundleParent::from_columns(inbound_id, lot_id).ok_or_else(|| {
            sqlx::Error::ColumnDecode {
                index: "inbound_id".into(),
                source: "bundle deve pertencer a exatamente um de inbound_id / lot_id".into(),
            }
        })?;

        Ok(Bundle {
            bundle_id: row.try_get("bundle_id")?,
            parent,
            bundle_no: row.try_get("bundle_no")?,
            weight: row.try_get("weight")?,
            melt_no: row.try_get("melt_no")?,
            is_outbounded: row.try_get("is_outbounded")?,
            is_repacked: row.try_get("is_repacked")?,
            before_photo: row.try_get("before_photo")?,
            after_photo: row.try_get("after_photo")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewBundle {
    #[validate(range(min = 1, message = "O número do bundle deve ser positivo."))]
    #[schema(example = 1)]
    pub bundle_no: i32,
    #[schema(example = "500")]
    pub weight: Decimal,
    pub melt_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BundlePiece {
    pub piece_id: i64,
    pub bundle_id: i64,
    pub piece_no: i32,
    pub weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPiece {
    #[validate(range(min = 1))]
    pub piece_no: i32,
    pub weight: Decimal,
}

/// Resultado da pesagem: o peso real e a lista completa de bundles persistida.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeighingResult {
    pub actual_weight: Decimal,
    pub bundles: Vec<Bundle>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepackResult {
    pub bundle: Bundle,
    pub pieces: Vec<BundlePiece>,
}

// --- Payloads ---

/// Pesagem pela tela: `targetId` + `isInbound` dizem de quem são os bundles.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeighingPayload {
    pub target_id: i64,
    pub is_inbound: bool,
    #[schema(example = "25012.5")]
    pub actual_weight: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub bundles: Vec<NewBundle>,
}

impl WeighingPayload {
    pub fn target(&self) -> BundleParent {
        if self.is_inbound {
            BundleParent::Inbound(self.target_id)
        } else {
            BundleParent::Lot(self.target_id)
        }
    }
}

/// Pesagem vinda da fila offline, com localização por fallback.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActualWeightPayload {
    #[serde(flatten)]
    pub target: TargetLocator,
    pub actual_weight: Decimal,
    #[serde(default)]
    #[validate(nested)]
    pub bundles: Vec<NewBundle>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepackPayload {
    #[serde(flatten)]
    pub target: TargetLocator,
    #[validate(nested)]
    pub bundle: NewBundle,
    #[serde(default)]
    #[validate(nested)]
    pub pieces: Vec<NewPiece>,
    /// Base64, com ou sem prefixo `data:`
    pub before_photo: Option<String>,
    pub after_photo: Option<String>,
}

/// Números de bundle repetidos dentro da mesma lista.
pub fn duplicate_bundle_numbers(bundles: &[NewBundle]) -> Vec<i32> {
    repeated(bundles.iter().map(|b| b.bundle_no))
}

pub fn duplicate_piece_numbers(pieces: &[NewPiece]) -> Vec<i32> {
    repeated(pieces.iter().map(|p| p.piece_no))
}

fn repeated(numbers: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates: Vec<i32> = numbers.filter(|n| !seen.insert(*n)).collect();
    duplicates.sort_unstable();
    duplicates.dedup();
    duplicates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn parent_requires_exactly_one_column() {
        assert_eq!(BundleParent::from_columns(Some(5), None), Some(BundleParent::Inbound(5)));
        assert_eq!(BundleParent::from_columns(None, Some(9)), Some(BundleParent::Lot(9)));
        assert_eq!(BundleParent::from_columns(Some(5), Some(9)), None);
        assert_eq!(BundleParent::from_columns(None, None), None);
    }

    #[test]
    fn parent_exposes_only_its_own_id() {
        let parent = BundleParent::Inbound(7);
        assert_eq!(parent.inbound_id(), Some(7));
        assert_eq!(parent.lot_id(), None);
    }

    #[test]
    fn finds_repeated_bundle_numbers() {
        let bundles = vec![
            NewBundle { bundle_no: 1, weight: dec(500), melt_no: None },
            NewBundle { bundle_no: 2, weight: dec(500), melt_no: None },
            NewBundle { bundle_no: 1, weight: dec(499), melt_no: None },
        ];
        assert_eq!(duplicate_bundle_numbers(&bundles), vec![1]);
    }
}
