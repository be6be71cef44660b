mod call;
mod record;
mod schema;
