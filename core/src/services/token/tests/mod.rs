mod listener_tests;
mod support;
