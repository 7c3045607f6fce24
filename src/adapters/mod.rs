pub mod command_transformer;
