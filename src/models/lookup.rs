// src/models/lookup.rs

/// Tabelas de referência aceitas pelo resolvedor de nomes.
/// Tabela e colunas são fixas aqui, então podem ir direto para o SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LookupTable {
    Commodities,
    Brands,
    Shapes,
    ExLmeWarehouses,
    InboundWarehouses,
    ExWarehouseLocations,
}

impl LookupTable {
    pub fn table_name(self) -> &'static str {
        match self {
            LookupTable::Commodities => "commodities",
            LookupTable::Brands => "brands",
            LookupTable::Shapes => "shapes",
            LookupTable::ExLmeWarehouses => "exlmewarehouses",
            LookupTable::InboundWarehouses => "inboundwarehouses",
            LookupTable::ExWarehouseLocations => "exwarehouselocations",
        }
    }

    pub fn name_column(self) -> &'static str {
        match self {
            LookupTable::Commodities => "commodity_name",
            LookupTable::Brands => "brand_name",
            LookupTable::Shapes => "shape_name",
            LookupTable::ExLmeWarehouses => "exlmewarehouse_name",
            LookupTable::InboundWarehouses => "inboundwarehouse_name",
            LookupTable::ExWarehouseLocations => "exwarehouselocation_name",
        }
    }

    pub fn id_column(self) -> &'static str {
        match self {
            LookupTable::Commodities => "commodity_id",
            LookupTable::Brands => "brand_id",
            LookupTable::Shapes => "shape_id",
            LookupTable::ExLmeWarehouses => "exlmewarehouse_id",
            LookupTable::InboundWarehouses => "inboundwarehouse_id",
            LookupTable::ExWarehouseLocations => "exwarehouselocation_id",
        }
    }
}

/// IDs resolvidos a partir dos nomes do lote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedReferences {
    pub commodity_id: i64,
    pub brand_id: i64,
    pub shape_id: i64,
    pub ex_lme_warehouse_id: i64,
    pub inbound_warehouse_id: i64,
    pub ex_warehouse_location_id: i64,
}
