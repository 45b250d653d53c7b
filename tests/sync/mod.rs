mod deferral;
mod failures;
mod scenarios;
mod serialization;
