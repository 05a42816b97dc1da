mod settings_rows;
mod users;
