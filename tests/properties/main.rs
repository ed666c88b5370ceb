mod compensation_tests;
mod qualification_tests;
