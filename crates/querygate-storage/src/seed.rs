//! Sample business data for demos and tests.

use rusqlite::Connection;
use tracing::info;

use querygate_core::QuerygateError;

const SAMPLE_DATA: &str = "
INSERT INTO users (id, name, email, city, phone, created_at) VALUES
    (1, 'Alice Johnson', 'alice@example.com', 'New York', '555-0101', '2024-01-05'),
    (2, 'Bob Smith', 'bob@example.com', 'Chicago', '555-0102', '2024-01-18'),
    (3, 'Carol White', 'carol@example.com', 'San Francisco', '555-0103', '2024-02-02'),
    (4, 'David Brown', 'david@example.com', 'New York', '555-0104', '2024-02-20'),
    (5, 'Eva Green', 'eva@example.com', 'Austin', '555-0105', '2024-03-11'),
    (6, 'Frank Moore', 'frank@example.com', 'Chicago', '555-0106', '2024-03-28'),
    (7, 'Grace Lee', 'grace@example.com', 'Seattle', '555-0107', '2024-04-09'),
    (8, 'Henry Clark', 'henry@example.com', 'Boston', '555-0108', '2024-05-15');

INSERT INTO categories (id, name) VALUES
    (1, 'Electronics'),
    (2, 'Books'),
    (3, 'Home'),
    (4, 'Sports');

INSERT INTO products (id, name, category_id, price, stock) VALUES
    (1, 'Laptop', 1, 1299.99, 15),
    (2, 'Headphones', 1, 199.50, 80),
    (3, 'Rust in Action', 2, 39.99, 120),
    (4, 'Desk Lamp', 3, 45.00, 60),
    (5, 'Yoga Mat', 4, 29.99, 200),
    (6, 'Coffee Maker', 3, 89.00, 40);

INSERT INTO orders (id, user_id, amount, date, status) VALUES
    (1, 1, 1299.99, '2024-01-10', 'completed'),
    (2, 2, 39.99, '2024-01-22', 'completed'),
    (3, 3, 199.50, '2024-02-05', 'completed'),
    (4, 1, 45.00, '2024-02-14', 'completed'),
    (5, 4, 89.00, '2024-03-02', 'shipped'),
    (6, 5, 29.99, '2024-03-19', 'completed'),
    (7, 6, 1299.99, '2024-04-01', 'completed'),
    (8, 2, 199.50, '2024-04-17', 'cancelled'),
    (9, 7, 39.99, '2024-05-08', 'completed'),
    (10, 8, 89.00, '2024-05-25', 'shipped'),
    (11, 3, 45.00, '2024-06-03', 'completed'),
    (12, 4, 29.99, '2024-06-21', 'pending');

INSERT INTO sales (month, region, product_id, amount) VALUES
    ('2024-01', 'North', 1, 15400.00),
    ('2024-01', 'South', 2, 4200.00),
    ('2024-02', 'North', 3, 3900.00),
    ('2024-02', 'South', 1, 12800.00),
    ('2024-03', 'North', 4, 5100.00),
    ('2024-03', 'South', 5, 2600.00),
    ('2024-04', 'North', 1, 17900.00),
    ('2024-04', 'South', 6, 4700.00),
    ('2024-05', 'North', 2, 6300.00),
    ('2024-05', 'South', 3, 3100.00),
    ('2024-06', 'North', 1, 19200.00),
    ('2024-06', 'South', 4, 5600.00);

INSERT INTO analytics (metric, value, period) VALUES
    ('active_users', 1250, '2024-Q1'),
    ('active_users', 1480, '2024-Q2'),
    ('conversion_rate', 3.2, '2024-Q1'),
    ('conversion_rate', 3.7, '2024-Q2'),
    ('avg_order_value', 142.5, '2024-Q1'),
    ('avg_order_value', 158.9, '2024-Q2');
";

/// Populate the sample tables. Does nothing when users already exist.
pub fn seed_sample_data(conn: &Connection) -> Result<bool, QuerygateError> {
    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .map_err(|e| QuerygateError::Storage(format!("Failed to count users: {}", e)))?;
    if existing > 0 {
        return Ok(false);
    }

    conn.execute_batch(&format!("BEGIN;{}COMMIT;", SAMPLE_DATA))
        .map_err(|e| QuerygateError::Storage(format!("Failed to seed sample data: {}", e)))?;
    info!("Seeded sample business data");
    Ok(true)
}
