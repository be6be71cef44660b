mod credentials;
mod page_token;
mod refresh;
