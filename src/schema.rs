table! {
    spreadsheet_cells (name) {
        name -> Text,
        expr -> Nullable<Text>,
        cachedValue -> Nullable<Text>,
    }
}

table! {
    categories (id) {
        id -> Text,
        name -> Nullable<Text>,
        is_income -> Nullable<Integer>,
        cat_group -> Nullable<Text>,
        sort_order -> Nullable<Double>,
        tombstone -> Nullable<Integer>,
    }
}

table! {
    category_groups (id) {
        id -> Text,
        name -> Nullable<Text>,
        is_income -> Nullable<Integer>,
        sort_order -> Nullable<Double>,
        tombstone -> Nullable<Integer>,
    }
}
