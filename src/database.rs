use diesel::prelude::*;
use log::debug;
use std::cmp::Ordering;
use std::path::Path;

use crate::errors::*;
use crate::schema;

/// Read-only view of a downloaded budget's SQLite database.
pub struct BudgetDatabase {
    connection: SqliteConnection,
}

#[derive(Debug, PartialEq)]
pub struct SheetCell {
    pub name: String,
    pub cached_value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CategoryGroup {
    pub id: String,
    pub name: Option<String>,
    pub is_income: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: Option<String>,
    pub group_id: Option<String>,
    pub is_income: bool,
}

impl BudgetDatabase {
    pub fn open(database_file: &Path) -> Result<BudgetDatabase> {
        // 'establish' would happily create an empty database in place of a missing one.
        ensure!(
            database_file.is_file(),
            format!("Budget database file not found: {}", database_file.display())
        );
        let database_url = database_file.to_str().chain_err(|| {
            format!(
                "Budget database path is not valid UTF-8: {}",
                database_file.display()
            )
        })?;
        debug!("Using budget database file: {}", database_url);
        let connection = SqliteConnection::establish(database_url)
            .chain_err(|| "Failed to establish SQLite database connection")?;
        Ok(BudgetDatabase { connection })
    }

    /// Loads every cell of `sheet`, with the `<sheet>!` prefix stripped from the names.
    pub fn get_sheet_cells(&self, sheet: &str) -> Result<Vec<SheetCell>> {
        use schema::spreadsheet_cells::dsl::*;
        let prefix = format!("{}!", sheet);
        let rows = schema::spreadsheet_cells::table
            .select((name, cachedValue))
            .filter(name.like(format!("{}%", prefix)))
            .order(name)
            .load::<(String, Option<String>)>(&self.connection)
            .chain_err(|| format!("Failed to load cells of sheet {} from database", sheet))?;
        // LIKE is case-insensitive and treats '_' as a wildcard, so re-check the prefix exactly.
        Ok(rows
            .into_iter()
            .filter_map(|(cell_name, value)| {
                cell_name.strip_prefix(&prefix).map(|short_name| SheetCell {
                    name: short_name.to_string(),
                    cached_value: value,
                })
            })
            .collect())
    }

    /// Live category groups in display order.
    pub fn get_category_groups(&self) -> Result<Vec<CategoryGroup>> {
        use schema::category_groups::dsl::*;
        let mut rows = category_groups
            .select((id, name, is_income, sort_order, tombstone))
            .load::<(String, Option<String>, Option<i32>, Option<f64>, Option<i32>)>(
                &self.connection,
            )
            .chain_err(|| "Failed to load category groups from database")?;
        rows.retain(|row| !is_tombstoned(row.4));
        rows.sort_by(|a, b| compare_sort_order(a.3, b.3));
        Ok(rows
            .into_iter()
            .map(|(group_id, group_name, income, _, _)| CategoryGroup {
                id: group_id,
                name: group_name,
                is_income: income.unwrap_or(0) != 0,
            })
            .collect())
    }

    /// Live categories in display order.
    pub fn get_categories(&self) -> Result<Vec<Category>> {
        use schema::categories::dsl::*;
        let mut rows = categories
            .select((id, name, cat_group, is_income, sort_order, tombstone))
            .load::<(
                String,
                Option<String>,
                Option<String>,
                Option<i32>,
                Option<f64>,
                Option<i32>,
            )>(&self.connection)
            .chain_err(|| "Failed to load categories from database")?;
        rows.retain(|row| !is_tombstoned(row.5));
        rows.sort_by(|a, b| compare_sort_order(a.4, b.4));
        Ok(rows
            .into_iter()
            .map(
                |(category_id, category_name, group, income, _, _)| Category {
                    id: category_id,
                    name: category_name,
                    group_id: group,
                    is_income: income.unwrap_or(0) != 0,
                },
            )
            .collect())
    }
}

fn is_tombstoned(tombstone: Option<i32>) -> bool {
    tombstone.unwrap_or(0) != 0
}

fn compare_sort_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
