use wasm_bindgen::prelude::*;

mod utils;
mod settings;
mod controls;
mod motion;
mod scene;
mod renderer;


#[wasm_bindgen(start)]
pub fn dummy_main() {
}


/// Starts the demo. `asset_path` overrides the default spider model location.
#[wasm_bindgen]
pub async fn run(asset_path: Option<String>) {
    utils::set_panic_hook();
    renderer::main(settings::Settings::with_asset_path(asset_path)).await;
}
