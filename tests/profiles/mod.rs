mod composite;
mod properties;
mod scenarios;
