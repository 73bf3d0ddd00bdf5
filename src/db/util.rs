use tokio_postgres::Row;

#[derive(Debug, Clone)]
pub struct ColumnMapper {
  pub name: String,
  pub column: String,
  /// Filled by the database (serial ids, timestamps).
  pub generated: bool,
}

pub fn column(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name: name.to_string(),
    column: name.to_string(),
    generated: false,
  }
}

pub fn generated(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    generated: true,
    ..column(name)
  }
}

#[derive(Debug, Default, Clone)]
pub struct ColumnMappers {
  pub table_name: &'static str,
  pub columns: Vec<ColumnMapper>,
}

impl ColumnMappers {
  /// Column list, optionally prefixed with a table alias.
  pub fn get_columns(&self, alias: Option<&str>) -> String {
    self.columns.iter().map(|col| {
      match alias {
        Some(alias) => format!("{}.{}", alias, col.column),
        None => col.column.clone(),
      }
    }).collect::<Vec<String>>().join(", ")
  }

  pub fn build_select_query(&self) -> String {
    format!("SELECT {} FROM {}", self.get_columns(None), self.table_name)
  }

  /// `INSERT` of the non-generated columns, as `$1..$n`, returning `returning`.
  pub fn build_insert_query(&self, returning: &str) -> String {
    let names: Vec<&str> = self.columns.iter()
      .filter(|col| !col.generated)
      .map(|col| col.column.as_str())
      .collect();
    let values: Vec<String> = (1..=names.len()).map(|idx| format!("${}", idx)).collect();
    format!("INSERT INTO {}({}) VALUES({}) RETURNING {}",
      self.table_name, names.join(", "), values.join(", "), returning)
  }

  /// Insert for association tables, a no-op when the row already exists.
  pub fn build_insert_ignore(&self) -> String {
    let names: Vec<&str> = self.columns.iter().map(|col| col.column.as_str()).collect();
    let values: Vec<String> = (1..=names.len()).map(|idx| format!("${}", idx)).collect();
    format!("INSERT INTO {}({}) VALUES({}) ON CONFLICT DO NOTHING",
      self.table_name, names.join(", "), values.join(", "))
  }

  /// `DELETE` matching every column.
  pub fn build_delete_query(&self) -> String {
    let conds: Vec<String> = self.columns.iter().enumerate()
      .map(|(idx, col)| format!("{} = ${}", col.column, idx + 1))
      .collect();
    format!("DELETE FROM {} WHERE {}", self.table_name, conds.join(" AND "))
  }

  /// `SELECT EXISTS(..)` matching every column.
  pub fn build_exists_query(&self) -> String {
    let conds: Vec<String> = self.columns.iter().enumerate()
      .map(|(idx, col)| format!("{} = ${}", col.column, idx + 1))
      .collect();
    format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {})", self.table_name, conds.join(" AND "))
  }
}

pub fn opt_row<T, F>(row: &Option<Row>, map: F) -> Option<T>
where
  F: Fn(&Row) -> T,
{
  row.as_ref().map(map)
}
