mod html;
mod threshold;
mod view;

pub use html::{leaflet_head, render_map_document, render_map_fragment};
pub use threshold::{check_levels, check_percentile, highlight_flags, percentile, PercentileMethod};
pub use view::{
    build_map, Legend, MapRequest, MapSize, MapView, Overlay, PathStyle, RecordLayer,
    ZOOM_COUNTY, ZOOM_DEFAULT, ZOOM_STATE, ZOOM_ZIP,
};
