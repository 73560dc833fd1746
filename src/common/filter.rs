// src/common/filter.rs

use chrono::NaiveDate;

use crate::models::task::InboundTask;

/// Colunas filtráveis da listagem de tarefas (lote + agendamento).
/// O nome SQL vem daqui, nunca da requisição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskColumn {
    JobNo,
    ExWarehouseLot,
    Status,
    Commodity,
    Brand,
    InboundWarehouse,
    InboundDate,
    Report,
    ReportDuplicate,
}

impl TaskColumn {
    pub fn sql(self) -> &'static str {
        match self {
            TaskColumn::JobNo => "l.job_no",
            TaskColumn::ExWarehouseLot => "l.ex_warehouse_lot",
            // Enum do Postgres comparado como texto
            TaskColumn::Status => "l.status::text",
            TaskColumn::Commodity => "l.commodity",
            TaskColumn::Brand => "l.brand",
            TaskColumn::InboundWarehouse => "l.inbound_warehouse",
            TaskColumn::InboundDate => "s.inbound_date",
            TaskColumn::Report => "l.report",
            TaskColumn::ReportDuplicate => "l.report_duplicate",
        }
    }

    fn value_of(self, task: &InboundTask) -> Option<FilterValue> {
        match self {
            TaskColumn::JobNo => Some(FilterValue::Text(task.job_no.clone())),
            TaskColumn::ExWarehouseLot => task.ex_warehouse_lot.clone().map(FilterValue::Text),
            TaskColumn::Status => Some(FilterValue::Text(task.status.as_str().to_string())),
            TaskColumn::Commodity => Some(FilterValue::Text(task.commodity.clone())),
            TaskColumn::Brand => Some(FilterValue::Text(task.brand.clone())),
            TaskColumn::InboundWarehouse => Some(FilterValue::Text(task.inbound_warehouse.clone())),
            TaskColumn::InboundDate => Some(FilterValue::Date(task.inbound_date)),
            TaskColumn::Report => Some(FilterValue::Bool(task.report)),
            TaskColumn::ReportDuplicate => Some(FilterValue::Bool(task.report_duplicate)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    /// Busca parcial, sem diferenciar maiúsculas
    Contains,
    Gte,
    Lte,
}

#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum FilterValue {
    Text(String),
    Date(NaiveDate),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: TaskColumn,
    pub op: Operator,
    pub value: FilterValue,
}

impl Predicate {
    fn render(&self, placeholder: usize) -> String {
        let column = self.column.sql();
        match self.op {
            Operator::Eq => format!("{column} = ${placeholder}"),
            Operator::Contains => format!("{column} ILIKE ${placeholder}"),
            Operator::Gte => format!("{column} >= ${placeholder}"),
            Operator::Lte => format!("{column} <= ${placeholder}"),
        }
    }

    /// Valor efetivamente enviado ao driver (com curingas no caso do ILIKE).
    fn bound_value(&self) -> FilterValue {
        match (&self.op, &self.value) {
            (Operator::Contains, FilterValue::Text(text)) => {
                FilterValue::Text(format!("%{}%", escape_like(text)))
            }
            (_, value) => value.clone(),
        }
    }

    fn matches(&self, task: &InboundTask) -> bool {
        let Some(actual) = self.column.value_of(task) else {
            return false;
        };
        match self.op {
            Operator::Eq => actual == self.value,
            Operator::Contains => match (&actual, &self.value) {
                (FilterValue::Text(a), FilterValue::Text(needle)) => {
                    a.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
            Operator::Gte => same_kind(&actual, &self.value) && actual >= self.value,
            Operator::Lte => same_kind(&actual, &self.value) && actual <= self.value,
        }
    }
}

fn same_kind(a: &FilterValue, b: &FilterValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Lista de predicados combinados com AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    predicates: Vec<Predicate>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: TaskColumn, op: Operator, value: FilterValue) -> Self {
        self.predicates.push(Predicate { column, op, value });
        self
    }

    /// Só adiciona o predicado quando o valor veio preenchido.
    pub fn with_opt<T>(self, column: TaskColumn, op: Operator, value: Option<T>) -> Self
    where
        T: Into<FilterValue>,
    {
        match value {
            Some(v) => self.with(column, op, v.into()),
            None => self,
        }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Monta o trecho `WHERE ...` com placeholders a partir de `$first_placeholder`
    /// e devolve os valores na ordem em que devem ser vinculados.
    pub fn to_sql(&self, first_placeholder: usize) -> (String, Vec<FilterValue>) {
        if self.predicates.is_empty() {
            return (String::new(), Vec::new());
        }
        let clauses: Vec<String> = self
            .predicates
            .iter()
            .enumerate()
            .map(|(i, p)| p.render(first_placeholder + i))
            .collect();
        let values = self.predicates.iter().map(Predicate::bound_value).collect();
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }

    pub fn matches(&self, task: &InboundTask) -> bool {
        self.predicates.iter().all(|p| p.matches(task))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_renders_nothing() {
        let (sql, values) = TaskFilter::new().to_sql(1);
        assert!(sql.is_empty());
        assert!(values.is_empty());
    }

    #[test]
    fn renders_placeholders_in_order() {
        let from = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let filter = TaskFilter::new()
            .with(TaskColumn::Status, Operator::Eq, "Pending".to_string().into())
            .with(TaskColumn::InboundDate, Operator::Gte, from.into())
            .with(TaskColumn::ExWarehouseLot, Operator::Contains, "50_1".to_string().into());

        let (sql, values) = filter.to_sql(1);

        assert_eq!(
            sql,
            " WHERE l.status::text = $1 AND s.inbound_date >= $2 AND l.ex_warehouse_lot ILIKE $3"
        );
        assert_eq!(
            values,
            vec![
                FilterValue::Text("Pending".into()),
                FilterValue::Date(from),
                FilterValue::Text("%50\\_1%".into()),
            ]
        );
    }

    #[test]
    fn user_text_never_reaches_the_sql_string() {
        let filter = TaskFilter::new().with(
            TaskColumn::JobNo,
            Operator::Eq,
            "x'; DROP TABLE lot; --".to_string().into(),
        );
        let (sql, _) = filter.to_sql(4);
        assert_eq!(sql, " WHERE l.job_no = $4");
    }

    #[test]
    fn with_opt_skips_missing_values() {
        let filter = TaskFilter::new()
            .with_opt::<String>(TaskColumn::JobNo, Operator::Eq, None)
            .with_opt(TaskColumn::Report, Operator::Eq, Some(true));
        assert_eq!(filter.predicates().len(), 1);
    }
}
