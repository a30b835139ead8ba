mod export;
mod handlers;
mod types;

pub use export::{csv_line, csv_record, export_csv, CSV_HEADER};
pub use handlers::{
    all_readings, delete_node, latest_reading, list_nodes, modify_node, register_node,
};
pub use types::{
    DeleteResponse, ModifiedResponse, ModifyNodeBody, NodeResponse, ReadingResponse,
    RegisterNodeBody, RegisteredResponse, SensorRange,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use export::__path_export_csv;
pub use handlers::{
    __path_all_readings, __path_delete_node, __path_latest_reading, __path_list_nodes,
    __path_modify_node, __path_register_node,
};
