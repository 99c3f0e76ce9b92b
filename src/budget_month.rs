use serde_json::Value;
use std::collections::HashMap;

use crate::constants::*;
use crate::database::*;
use crate::types::*;

enum CellOwner {
    Group(usize),
    Category(usize),
}

/// Assembles the month document from one budget sheet's cells.
///
/// Cells named `<field>-<category id>` are attached to that category and cells named
/// `group-<field>-<group id>` to that group; categories are nested under their groups.
/// Every other cell stays at the top level under its own name. Field names are never
/// interpreted, so the document follows whatever the budget's sheet contains.
pub fn build_snapshot(
    month: &str,
    cells: Vec<SheetCell>,
    groups: &[CategoryGroup],
    categories: &[Category],
) -> BudgetSnapshot {
    let group_index: HashMap<&str, usize> = groups
        .iter()
        .enumerate()
        .map(|(index, group)| (group.id.as_str(), index))
        .collect();
    let categories: Vec<&Category> = categories
        .iter()
        .filter(|category| {
            category
                .group_id
                .as_deref()
                .map_or(false, |group_id| group_index.contains_key(group_id))
        })
        .collect();
    let category_index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(index, category)| (category.id.as_str(), index))
        .collect();

    let mut group_fields: Vec<BudgetSnapshot> = groups.iter().map(group_document).collect();
    let mut category_fields: Vec<BudgetSnapshot> =
        categories.iter().map(|category| category_document(category)).collect();
    let mut snapshot = BudgetSnapshot::new();

    for cell in cells {
        let value = cell_value(cell.cached_value);
        match cell_owner(&cell.name, &group_index, &category_index) {
            Some((CellOwner::Category(index), field)) => {
                category_fields[index].insert(field, value);
            }
            Some((CellOwner::Group(index), field)) => {
                let field = field
                    .strip_prefix(GROUP_CELL_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(field);
                group_fields[index].insert(field, value);
            }
            None => {
                snapshot.insert(cell.name, value);
            }
        }
    }

    let mut nested: Vec<Vec<Value>> = vec![Vec::new(); groups.len()];
    for (category, fields) in categories.iter().zip(category_fields) {
        if let Some(index) = category
            .group_id
            .as_deref()
            .and_then(|group_id| group_index.get(group_id))
        {
            nested[*index].push(Value::Object(fields));
        }
    }
    let group_values = group_fields
        .into_iter()
        .zip(nested)
        .map(|(mut fields, members)| {
            fields.insert(SNAPSHOT_CATEGORIES_KEY.to_string(), Value::Array(members));
            Value::Object(fields)
        })
        .collect();

    snapshot.insert(
        SNAPSHOT_CATEGORY_GROUPS_KEY.to_string(),
        Value::Array(group_values),
    );
    snapshot.insert(
        SNAPSHOT_MONTH_KEY.to_string(),
        Value::String(month.to_string()),
    );
    snapshot
}

// Ids contain dashes themselves, so try every dash from the left until the rest is a known id.
fn cell_owner(
    cell_name: &str,
    group_index: &HashMap<&str, usize>,
    category_index: &HashMap<&str, usize>,
) -> Option<(CellOwner, String)> {
    cell_name
        .match_indices('-')
        .find_map(|(position, _)| {
            let (field, id) = (&cell_name[..position], &cell_name[position + 1..]);
            if let Some(index) = category_index.get(id) {
                Some((CellOwner::Category(*index), field))
            } else {
                group_index
                    .get(id)
                    .map(|index| (CellOwner::Group(*index), field))
            }
        })
        .map(|(owner, field)| (owner, field.to_string()))
}

fn cell_value(cached_value: Option<String>) -> Value {
    match cached_value {
        Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        None => Value::Null,
    }
}

fn group_document(group: &CategoryGroup) -> BudgetSnapshot {
    let mut fields = BudgetSnapshot::new();
    fields.insert("id".to_string(), Value::String(group.id.clone()));
    fields.insert("name".to_string(), optional_string(&group.name));
    fields.insert("is_income".to_string(), Value::Bool(group.is_income));
    fields
}

fn category_document(category: &Category) -> BudgetSnapshot {
    let mut fields = BudgetSnapshot::new();
    fields.insert("id".to_string(), Value::String(category.id.clone()));
    fields.insert("name".to_string(), optional_string(&category.name));
    fields.insert("group_id".to_string(), optional_string(&category.group_id));
    fields.insert("is_income".to_string(), Value::Bool(category.is_income));
    fields
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}
