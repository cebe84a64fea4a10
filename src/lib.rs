//! Retail POS dashboard - Tauri v2 backend.
//!
//! Registers the IPC command handlers the React screens call via
//! `@tauri-apps/api/core::invoke()`. The hosted dashboard's tables and
//! stored procedures live here as a local SQLite data service; screens
//! keep the same operation names and row shapes.

use tracing::info;

mod auth;
mod catalog;
mod commands;
mod csv;
mod currency;
mod customers;
mod db;
mod expenses;
mod invoice;
mod logging;
mod reports;
mod sales;
mod scanner;
mod serial;
mod stock;
mod users;

/// Low-stock monitor cadence (seconds).
const LOW_STOCK_MONITOR_INTERVAL_SECS: u64 = 300;

pub fn run() {
    logging::init("info,retail_pos_lib=debug");

    info!("Starting retail POS v{}", env!("CARGO_PKG_VERSION"));

    tauri::Builder::default()
        .setup(|app| {
            use std::sync::Arc;
            use tauri::Manager;

            let app_data_dir = app
                .path()
                .app_data_dir()
                .expect("Failed to get app data dir");

            // Main DB connection for Tauri commands
            let db_state = db::init(&app_data_dir).expect("Failed to initialize database");
            app.manage(db_state);

            // Auth state
            app.manage(auth::AuthState::new());

            // Second DB connection for the background low-stock monitor
            let db_for_monitor =
                Arc::new(db::init(&app_data_dir).expect("Failed to init monitor database"));
            commands::products::start_low_stock_monitor(
                app.handle().clone(),
                db_for_monitor,
                LOW_STOCK_MONITOR_INTERVAL_SECS,
            );

            info!("Database, auth, and low-stock monitor registered");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Auth
            commands::auth::auth_login,
            commands::auth::auth_logout,
            commands::auth::auth_get_current,
            commands::auth::auth_has_permission,
            commands::auth::auth_has_role,
            commands::auth::auth_track_activity,
            commands::auth::auth_change_pin,
            // Inventory
            commands::products::product_get_all,
            commands::products::product_search,
            commands::products::product_get_by_barcode,
            commands::products::product_create,
            commands::products::product_update,
            commands::products::product_delete,
            commands::products::inventory_get_stats,
            commands::products::inventory_get_low_stock,
            commands::products::stock_adjust,
            commands::products::stock_get_movements,
            commands::products::category_get_all,
            commands::products::category_create,
            commands::products::category_update,
            commands::products::category_delete,
            commands::products::supplier_get_all,
            commands::products::supplier_create,
            commands::products::supplier_update,
            commands::products::supplier_delete,
            // Customers
            commands::customers::customer_get_all,
            commands::customers::customer_search,
            commands::customers::customer_create,
            commands::customers::customer_update,
            commands::customers::customer_delete,
            // POS / Sales
            commands::sales::pos_search_products,
            commands::sales::pos_lookup_barcode,
            commands::sales::checkout_complete,
            commands::sales::sales_get_recent,
            commands::sales::invoice_render,
            // Expenses
            commands::expenses::expense_get_all,
            commands::expenses::expense_get_categories,
            commands::expenses::expense_create,
            commands::expenses::expense_update,
            commands::expenses::expense_delete,
            commands::expenses::expense_get_summary,
            commands::expenses::expense_export_csv,
            // Reports
            commands::reports::report_get_today_stats,
            commands::reports::report_get_recent_transactions,
            commands::reports::report_get_sales_trend,
            commands::reports::report_get_top_products,
            commands::reports::report_get_payment_breakdown,
            commands::reports::report_get_profit_loss_realtime,
            commands::reports::report_get_profit_loss_periods,
            commands::reports::report_export_profit_loss,
            // Users
            commands::users::user_get_all,
            commands::users::user_create,
            commands::users::user_update,
            commands::users::user_set_pin,
            commands::users::user_deactivate,
            commands::users::user_get_role,
            // Import/Export
            commands::import_export::import_data,
            commands::import_export::export_data,
            commands::import_export::export_template,
            // Settings
            commands::settings::settings_get_store_profile,
            commands::settings::settings_set_store_profile,
            commands::settings::settings_get_tax_rate,
            commands::settings::settings_set_tax_rate,
            commands::settings::settings_get_scanner,
            commands::settings::settings_set_scanner,
            // Scanner hardware
            commands::hardware::serial_list_ports,
            commands::hardware::scanner_serial_start,
            commands::hardware::scanner_serial_stop,
            commands::hardware::scanner_serial_status,
        ])
        .run(tauri::generate_context!())
        .expect("error while running retail POS");
}
