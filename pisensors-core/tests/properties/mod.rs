mod parser_tests;
mod rate_tests;
mod settings_tests;
