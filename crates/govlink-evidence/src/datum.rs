//! Raw evaluator output: scalars, nested containers and dataframe-like tables.
//!
//! `Float(NaN)` is the not-a-number sentinel produced by numeric evaluators;
//! `Null` is the explicit absent marker the sanitizer replaces it with.

use crate::error::ValidationError;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Datum>),
    Map(BTreeMap<String, Datum>),
    /// Homogeneous numeric array; `None` cells are absent.
    Array(Vec<Option<f64>>),
    Table(Table),
}

impl Datum {
    pub fn is_nan(&self) -> bool {
        matches!(self, Datum::Float(f) if f.is_nan())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Numeric view of `Int`/`Float` cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Int(i) => Some(*i as f64),
            Datum::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Datum::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Short type name used in shape errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "null",
            Datum::Bool(_) => "bool",
            Datum::Int(_) => "int",
            Datum::Float(_) => "float",
            Datum::Str(_) => "string",
            Datum::List(_) => "list",
            Datum::Map(_) => "map",
            Datum::Array(_) => "array",
            Datum::Table(_) => "table",
        }
    }

    /// JSON rendering. Non-finite floats have no JSON form and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Datum::Null => Value::Null,
            Datum::Bool(b) => Value::Bool(*b),
            Datum::Int(i) => Value::Number((*i).into()),
            Datum::Float(f) => float_to_json(*f),
            Datum::Str(s) => Value::String(s.clone()),
            Datum::List(items) => Value::Array(items.iter().map(Datum::to_json).collect()),
            Datum::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            Datum::Array(cells) => Value::Array(
                cells
                    .iter()
                    .map(|c| c.map(float_to_json).unwrap_or(Value::Null))
                    .collect(),
            ),
            Datum::Table(table) => table.to_json(),
        }
    }

    /// Inverse of [`Datum::to_json`] for plain JSON (tables come back as maps).
    pub fn from_json(value: &Value) -> Datum {
        match value {
            Value::Null => Datum::Null,
            Value::Bool(b) => Datum::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Datum::Int(i),
                None => Datum::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Datum::Str(s.clone()),
            Value::Array(items) => Datum::List(items.iter().map(Datum::from_json).collect()),
            Value::Object(map) => Datum::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Datum::from_json(v)))
                    .collect(),
            ),
        }
    }
}

fn float_to_json(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Float(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Str(value.to_string())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Str(value)
    }
}

impl From<Option<f64>> for Datum {
    fn from(value: Option<f64>) -> Self {
        value.map(Datum::Float).unwrap_or(Datum::Null)
    }
}

impl From<Table> for Datum {
    fn from(value: Table) -> Self {
        Datum::Table(value)
    }
}

/// Column storage type, inferred from cell values when not declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Bool,
    Object,
    Category,
    Datetime,
    Other(String),
}

impl ColumnType {
    /// Type name carried in table evidence.
    pub fn wire_name(&self) -> &str {
        match self {
            ColumnType::Int64 | ColumnType::Float64 => "number",
            ColumnType::Object | ColumnType::Category => "string",
            ColumnType::Datetime => "datetime",
            ColumnType::Bool => "bool",
            ColumnType::Other(name) => name,
        }
    }

    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "number" => ColumnType::Float64,
            "string" => ColumnType::Object,
            "datetime" => ColumnType::Datetime,
            "bool" => ColumnType::Bool,
            other => ColumnType::Other(other.to_string()),
        }
    }

    /// Conservative inference: all-int stays `Int64`, any float (NaN
    /// included) widens to `Float64`, mixed or textual cells are `Object`.
    fn infer<'a>(cells: impl Iterator<Item = &'a Datum>) -> Self {
        let mut saw_int = false;
        let mut saw_float = false;
        let mut saw_bool = false;
        let mut saw_other = false;
        for cell in cells {
            match cell {
                Datum::Int(_) => saw_int = true,
                Datum::Float(_) => saw_float = true,
                Datum::Bool(_) => saw_bool = true,
                Datum::Null => {}
                _ => saw_other = true,
            }
        }
        match (saw_int, saw_float, saw_bool, saw_other) {
            (_, _, _, true) => ColumnType::Object,
            (true, false, false, false) => ColumnType::Int64,
            (_, true, false, false) => ColumnType::Float64,
            (false, false, true, false) => ColumnType::Bool,
            _ => ColumnType::Object,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

/// Dataframe-like table: named typed columns, optional string row index,
/// row-major cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: Option<String>,
    columns: Vec<Column>,
    index: Option<Vec<String>>,
    rows: Vec<Vec<Datum>>,
}

impl Table {
    /// Build a table from column names and rows, inferring column types.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Datum>>,
    ) -> Result<Self, ValidationError> {
        let names: Vec<String> = columns.into_iter().map(Into::into).collect();
        check_row_widths(names.len(), &rows)?;
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Column {
                name,
                dtype: ColumnType::infer(rows.iter().map(|row| &row[idx])),
            })
            .collect();
        Ok(Self {
            name: None,
            columns,
            index: None,
            rows,
        })
    }

    /// Build a table with declared column types.
    pub fn with_columns(
        columns: Vec<Column>,
        rows: Vec<Vec<Datum>>,
    ) -> Result<Self, ValidationError> {
        check_row_widths(columns.len(), &rows)?;
        Ok(Self {
            name: None,
            columns,
            index: None,
            rows,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a row index; it must label every row exactly once.
    pub fn indexed<S: Into<String>>(
        mut self,
        index: impl IntoIterator<Item = S>,
    ) -> Result<Self, ValidationError> {
        let index: Vec<String> = index.into_iter().map(Into::into).collect();
        if index.len() != self.rows.len() {
            return Err(ValidationError::MalformedTable(format!(
                "index has {} entries for {} rows",
                index.len(),
                self.rows.len()
            )));
        }
        self.index = Some(index);
        Ok(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn index(&self) -> Option<&[String]> {
        self.index.as_deref()
    }

    pub fn rows(&self) -> &[Vec<Datum>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rebuild with every cell mapped through `f`, keeping name, index and
    /// column types.
    pub fn map_cells(&self, f: impl Fn(&Datum) -> Datum) -> Table {
        Table {
            name: self.name.clone(),
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(&f).collect())
                .collect(),
        }
    }

    /// JSON rendering for tables nested inside other data: column name → cells.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (idx, column) in self.columns.iter().enumerate() {
            let cells = self.rows.iter().map(|row| row[idx].to_json()).collect();
            out.insert(column.name.clone(), Value::Array(cells));
        }
        Value::Object(out)
    }
}

fn check_row_widths(width: usize, rows: &[Vec<Datum>]) -> Result<(), ValidationError> {
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(ValidationError::MalformedTable(format!(
                "row {idx} has {} cells for {width} columns",
                row.len()
            )));
        }
    }
    Ok(())
}
