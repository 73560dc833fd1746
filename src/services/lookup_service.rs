// src/services/lookup_service.rs

use crate::{
    common::error::AppError,
    db::StoreTx,
    models::{
        lookup::{LookupTable, ResolvedReferences},
        lot::Lot,
    },
};

/// Único ponto de conversão nome -> ID das tabelas de referência.
/// Sempre roda dentro da transação de quem chama.
#[derive(Clone, Copy, Default)]
pub struct LookupResolver;

impl LookupResolver {
    pub fn new() -> Self {
        Self
    }

    pub async fn resolve<T: StoreTx>(&self, tx: &mut T, table: LookupTable, value: &str) -> Result<i64, AppError> {
        let wanted = value.trim();
        tx.resolve_reference_id(table, wanted)
            .await?
            .ok_or_else(|| AppError::LookupNotFound {
                table: table.table_name(),
                value: wanted.to_string(),
            })
    }

    /// Resolve os seis nomes do lote. Falha no primeiro que não existir.
    pub async fn resolve_lot<T: StoreTx>(&self, tx: &mut T, lot: &Lot) -> Result<ResolvedReferences, AppError> {
        Ok(ResolvedReferences {
            commodity_id: self.resolve(tx, LookupTable::Commodities, &lot.commodity).await?,
            brand_id: self.resolve(tx, LookupTable::Brands, &lot.brand).await?,
            shape_id: self.resolve(tx, LookupTable::Shapes, &lot.shape).await?,
            ex_lme_warehouse_id: self.resolve(tx, LookupTable::ExLmeWarehouses, &lot.ex_lme_warehouse).await?,
            inbound_warehouse_id: self.resolve(tx, LookupTable::InboundWarehouses, &lot.inbound_warehouse).await?,
            ex_warehouse_location_id: self
                .resolve(tx, LookupTable::ExWarehouseLocations, &lot.ex_warehouse_location)
                .await?,
        })
    }
}
