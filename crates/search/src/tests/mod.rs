mod providers;
mod service_scenarios;
