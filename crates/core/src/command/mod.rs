pub mod command_dispatcher;
