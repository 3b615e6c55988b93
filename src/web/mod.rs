pub mod responses;
pub mod router;
pub mod state;
pub mod templates;
pub mod upload_ui;
pub mod uploads;

pub use responses::{ApiError, json_error, upload_rejected};
pub use state::AppState;
pub use templates::{
    TabPanel, ToolPageLayout, escape_html, render_footer, render_tab_group, render_tool_page,
};
pub use upload_ui::{
    UPLOAD_WIDGET_SCRIPT, UPLOAD_WIDGET_STYLES, UploadWidgetConfig, render_upload_widget,
};
pub use uploads::{FileFieldConfig, UploadOutcome, UploadedFile, read_upload_form};
