diesel::table! {
    stock_items (id) {
        id -> Uuid,
        name -> Varchar,
        available_quantity -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    reservations (id) {
        id -> Uuid,
        order_id -> Uuid,
        stock_item_id -> Uuid,
        quantity -> Int4,
        status -> Varchar,
        reserved_until -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(reservations -> stock_items (stock_item_id));

diesel::allow_tables_to_appear_in_same_query!(stock_items, reservations);
