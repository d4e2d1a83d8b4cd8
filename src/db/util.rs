#[derive(Debug, Clone)]
pub struct ColumnMapper {
  pub name: &'static str,
  /// Filled by the database, left out of inserts.
  pub generated: bool,
}

pub fn column(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    generated: false,
  }
}

pub fn generated(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    generated: true,
  }
}

#[derive(Debug, Default, Clone)]
pub struct ColumnMappers {
  pub table_name: &'static str,
  pub columns: Vec<ColumnMapper>,
}

impl ColumnMappers {
  /// Comma separated column list, each qualified by `alias` when given.
  pub fn get_columns(&self, alias: Option<&str>) -> String {
    self.columns.iter().map(|col| {
      match alias {
        Some(alias) => format!("{}.{}", alias, col.name),
        None => col.name.to_string(),
      }
    }).collect::<Vec<String>>().join(", ")
  }

  /// Number of columns a `*_from_row` helper reads.
  pub fn len(&self) -> usize {
    self.columns.len()
  }

  pub fn build_select_query(&self, alias: &str) -> String {
    format!("SELECT {} FROM {} {}",
      self.get_columns(Some(alias)), self.table_name, alias)
  }

  pub fn build_insert_query(&self) -> String {
    let mut names = Vec::new();
    let mut values = Vec::new();
    for col in self.columns.iter().filter(|col| !col.generated) {
      names.push(col.name);
      values.push(format!("${}", names.len()));
    }
    format!("INSERT INTO {}({}) VALUES({}) RETURNING {}",
      self.table_name, names.join(", "), values.join(", "), self.get_columns(None))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mappers() -> ColumnMappers {
    ColumnMappers {
      table_name: "tags",
      columns: vec![
        generated("id"),
        column("title"),
      ],
    }
  }

  #[test]
  fn select_query_uses_alias() {
    assert_eq!(mappers().build_select_query("t"), "SELECT t.id, t.title FROM tags t");
  }

  #[test]
  fn insert_skips_generated_columns() {
    assert_eq!(mappers().build_insert_query(),
      "INSERT INTO tags(title) VALUES($1) RETURNING id, title");
  }
}
