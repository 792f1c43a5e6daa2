pub mod image_file_writer;
