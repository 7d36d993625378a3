mod concurrency;
mod integration;
