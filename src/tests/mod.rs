mod admin_token;
mod helper;
