pub struct DefaultsConfig {
    pub outdir: &'static str,
    pub prediction_command: &'static str,
    pub num_seeds: u32,
    pub num_recycle: u32,
    pub num_relax: u32,
    pub mmseqs_program: &'static str,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            outdir: "output",
            prediction_command: "colabfold_batch",
            num_seeds: 1,
            num_recycle: 3,
            num_relax: 0,
            mmseqs_program: "mmseqs",
        }
    }
}
