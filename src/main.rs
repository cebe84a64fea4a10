#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    retail_pos_lib::run()
}
