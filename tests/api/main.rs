mod analytics;
mod newsletters;
mod subscribers;
