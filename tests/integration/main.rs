#[macro_use]
mod fixture;

mod concurrency_tests;
mod payroll_tests;
mod workflow_tests;
