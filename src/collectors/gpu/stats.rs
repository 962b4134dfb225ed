use crate::metrics::Desc;

pub static GPU_NUM_DEVICES: Desc =
    Desc::gauge("nvidia_gpu_num_devices", "Number of Nvidia GPU devices.");

pub static GPU_INFO: Desc = Desc::gauge(
    "nvidia_gpu_info",
    "Nvidia GPU properties as reported by nvidia-smi, one series per queried property.",
);
