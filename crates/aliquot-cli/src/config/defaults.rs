pub struct DefaultsConfig {
    pub working_volume: f64,
    pub liquid_presence_detection: bool,
    pub add_final_air_gap: bool,
    pub trash: [f64; 3],
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            working_volume: 200.0,
            liquid_presence_detection: false,
            add_final_air_gap: true,
            trash: [0.0, 0.0, 80.0],
        }
    }
}
