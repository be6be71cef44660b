mod auth_refresh;
mod batch_client;
mod helpers;
mod notebook;
