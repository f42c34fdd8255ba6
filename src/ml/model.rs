use anyhow::{anyhow, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use std::path::Path;

/// Width of the pooled feature vector feeding the classification head.
pub const FEATURE_DIM: usize = 512;
/// Head size of the torchvision checkpoint.
pub const IMAGENET_CLASSES: usize = 1000;

const BLOCKS_PER_STAGE: usize = 2;

/// torchvision key → ResNet record path, applied in order.
const TORCHVISION_KEY_REMAPS: [(&str, &str); 3] = [
    ("(.+)\\.downsample\\.0\\.(.+)", "$1.downsample.conv.$2"),
    ("(.+)\\.downsample\\.1\\.(.+)", "$1.downsample.bn.$2"),
    ("(layer[1-4])\\.([0-9]+)\\.(.+)", "$1.blocks.$2.$3"),
];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ResNetConfig {
    pub num_classes: usize,
}

impl ResNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let conv1 = Conv2dConfig::new([3, 64], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let bn1 = BatchNormConfig::new(64).init(device);
        let maxpool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        // the first stage keeps the resolution maxpool already halved
        let layer1 = LayerBlock::new(64, 64, 1, device);
        let layer2 = LayerBlock::new(64, 128, 2, device);
        let layer3 = LayerBlock::new(128, 256, 2, device);
        let layer4 = LayerBlock::new(256, FEATURE_DIM, 2, device);

        ResNet {
            conv1,
            bn1,
            relu: Relu::new(),
            maxpool,
            layer1,
            layer2,
            layer3,
            layer4,
            avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc: LinearConfig::new(FEATURE_DIM, self.num_classes).init(device),
        }
    }
}

fn conv3x3<B: Backend>(in_c: usize, out_c: usize, stride: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([in_c, out_c], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .with_bias(false)
        .init(device)
}

/// 1×1 projection on the residual path when shape changes.
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B, 2>,
}

impl<B: Backend> Downsample<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BasicBlock<B: Backend> {
    pub conv1:      Conv2d<B>,
    pub bn1:        BatchNorm<B, 2>,
    pub relu:       Relu,
    pub conv2:      Conv2d<B>,
    pub bn2:        BatchNorm<B, 2>,
    pub downsample: Option<Downsample<B>>,
}

impl<B: Backend> BasicBlock<B> {
    fn new(in_c: usize, out_c: usize, stride: usize, device: &B::Device) -> Self {
        let downsample = (stride != 1 || in_c != out_c).then(|| Downsample {
            conv: Conv2dConfig::new([in_c, out_c], [1, 1])
                .with_stride([stride, stride])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_c).init(device),
        });

        Self {
            conv1: conv3x3(in_c, out_c, stride, device),
            bn1:   BatchNormConfig::new(out_c).init(device),
            relu:  Relu::new(),
            conv2: conv3x3(out_c, out_c, 1, device),
            bn2:   BatchNormConfig::new(out_c).init(device),
            downsample,
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(d) => d.forward(x.clone()),
            None    => x.clone(),
        };
        let out = self.relu.forward(self.bn1.forward(self.conv1.forward(x)));
        let out = self.bn2.forward(self.conv2.forward(out));
        self.relu.forward(out + identity)
    }
}

/// One ResNet stage. Field name `blocks` matches the key remap
/// `layerN.i.*` → `layerN.blocks.i.*` used when importing weights.
#[derive(Module, Debug)]
pub struct LayerBlock<B: Backend> {
    pub blocks: Vec<BasicBlock<B>>,
}

impl<B: Backend> LayerBlock<B> {
    fn new(in_c: usize, out_c: usize, stride: usize, device: &B::Device) -> Self {
        let blocks = (0..BLOCKS_PER_STAGE)
            .map(|i| {
                if i == 0 {
                    BasicBlock::new(in_c, out_c, stride, device)
                } else {
                    BasicBlock::new(out_c, out_c, 1, device)
                }
            })
            .collect();
        Self { blocks }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.blocks.iter().fold(x, |x, block| block.forward(x))
    }
}

/// ResNet-18 with field names mirroring torchvision's state dict.
#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub bn1:     BatchNorm<B, 2>,
    pub relu:    Relu,
    pub maxpool: MaxPool2d,
    pub layer1:  LayerBlock<B>,
    pub layer2:  LayerBlock<B>,
    pub layer3:  LayerBlock<B>,
    pub layer4:  LayerBlock<B>,
    pub avgpool: AdaptiveAvgPool2d,
    pub fc:      Linear<B>,
}

impl<B: Backend> ResNet<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(images)));
        let x = self.maxpool.forward(x);
        let x = self.layer1.forward(x);
        let x = self.layer2.forward(x);
        let x = self.layer3.forward(x);
        let x = self.layer4.forward(x);
        let x = self.avgpool.forward(x); // [batch, 512, 1, 1]
        self.fc.forward(x.flatten::<2>(1, 3))
    }

    /// Cross-entropy loss against integer class targets, plus the logits.
    pub fn forward_classification(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }

    /// Swap the classification layer for a freshly initialised one.
    pub fn with_head(mut self, num_classes: usize, device: &B::Device) -> Self {
        self.fc = LinearConfig::new(FEATURE_DIM, num_classes).init(device);
        self
    }

    /// Stop gradients everywhere but the classification layer.
    pub fn freeze_backbone(self) -> Self {
        Self {
            conv1:   self.conv1.no_grad(),
            bn1:     self.bn1.no_grad(),
            layer1:  self.layer1.no_grad(),
            layer2:  self.layer2.no_grad(),
            layer3:  self.layer3.no_grad(),
            layer4:  self.layer4.no_grad(),
            ..self
        }
    }
}

/// Build ResNet-18 with its 1000-class ImageNet head from a torchvision
/// `resnet18` `.pth` checkpoint. Callers swap the head with [`ResNet::with_head`].
pub fn load_pretrained<B: Backend>(path: &Path, device: &B::Device) -> Result<ResNet<B>> {
    if !path.is_file() {
        return Err(anyhow!("pretrained weights '{}' not found", path.display()));
    }

    let args = TORCHVISION_KEY_REMAPS
        .iter()
        .fold(LoadArgs::new(path.to_path_buf()), |args, (pattern, replacement)| {
            args.with_key_remap(pattern, replacement)
        });

    let record: ResNetRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::new()
        .load(args, device)
        .map_err(|e| anyhow!("cannot import '{}': {e:?}", path.display()))?;

    Ok(ResNetConfig::new(IMAGENET_CLASSES)
        .init::<B>(device)
        .load_record(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::Param;
    use burn::optim::{GradientsParams, Optimizer, SgdConfig};
    use burn::tensor::Distribution;
    use regex::Regex;

    type TestBackend = NdArray;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: ResNet<TestBackend> = ResNetConfig::new(2).init(&device);
        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 32], &device);
        assert_eq!(model.forward(images).dims(), [2, 2]);
    }

    #[test]
    fn test_param_count_matches_resnet18() {
        let device = Default::default();
        // num_params also counts BatchNorm running mean and variance:
        // 4800 channels × 2 on top of torchvision's 11,689,512 trainable
        let model: ResNet<TestBackend> = ResNetConfig::new(IMAGENET_CLASSES).init(&device);
        assert_eq!(model.num_params(), 11_699_112);

        let binary = model.with_head(2, &device);
        assert_eq!(binary.fc.weight.dims(), [FEATURE_DIM, 2]);
        assert_eq!(binary.num_params(), 11_187_138);
    }

    #[test]
    fn test_loss_is_finite() {
        let device = Default::default();
        let model: ResNet<Autodiff<TestBackend>> = ResNetConfig::new(2).init(&device);
        let images = Tensor::<Autodiff<TestBackend>, 4>::ones([2, 3, 32, 32], &device);
        let targets = Tensor::<Autodiff<TestBackend>, 1, Int>::from_ints([0, 1], &device);
        let (loss, logits) = model.forward_classification(images, targets);
        assert_eq!(logits.dims(), [2, 2]);
        let loss: f64 = loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    fn weights(param: &Param<Tensor<Autodiff<TestBackend>, 4>>) -> Vec<f32> {
        param.val().into_data().to_vec::<f32>().unwrap()
    }

    fn head(model: &ResNet<Autodiff<TestBackend>>) -> Vec<f32> {
        model.fc.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    /// One SGD step on a random batch; returns the updated model.
    fn sgd_step(model: ResNet<Autodiff<TestBackend>>) -> ResNet<Autodiff<TestBackend>> {
        let device = Default::default();
        // random pixels: identical items would normalise to zero in BatchNorm
        let images = Tensor::<Autodiff<TestBackend>, 4>::random(
            [4, 3, 32, 32],
            Distribution::Normal(0.0, 1.0),
            &device,
        );
        let targets = Tensor::<Autodiff<TestBackend>, 1, Int>::from_ints([0, 1, 0, 1], &device);

        let mut optim = SgdConfig::new().init();
        let (loss, _) = model.forward_classification(images, targets);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        optim.step(0.1, model, grads)
    }

    #[test]
    fn test_frozen_backbone_only_trains_head() {
        let device = Default::default();
        let model: ResNet<Autodiff<TestBackend>> = ResNetConfig::new(2).init(&device).freeze_backbone();
        let conv1  = weights(&model.conv1.weight);
        let layer4 = weights(&model.layer4.blocks[1].conv2.weight);
        let fc     = head(&model);

        let stepped = sgd_step(model);
        assert_eq!(weights(&stepped.conv1.weight), conv1);
        assert_eq!(weights(&stepped.layer4.blocks[1].conv2.weight), layer4);
        assert_ne!(head(&stepped), fc);
    }

    #[test]
    fn test_unfrozen_backbone_trains() {
        let device = Default::default();
        let model: ResNet<Autodiff<TestBackend>> = ResNetConfig::new(2).init(&device);
        let conv1 = weights(&model.conv1.weight);

        let stepped = sgd_step(model);
        assert_ne!(weights(&stepped.conv1.weight), conv1);
    }

    /// Only the regex table: replays it the way `LoadArgs::with_key_remap`
    /// rules are applied, without a checkpoint file.
    #[test]
    fn test_remap_table_rewrites_torchvision_keys() {
        let remap = |key: &str| {
            TORCHVISION_KEY_REMAPS.iter().fold(key.to_string(), |key, (pattern, replacement)| {
                Regex::new(pattern).unwrap().replace_all(&key, *replacement).into_owned()
            })
        };

        assert_eq!(remap("conv1.weight"), "conv1.weight");
        assert_eq!(remap("fc.bias"), "fc.bias");
        assert_eq!(remap("layer1.1.bn2.running_mean"), "layer1.blocks.1.bn2.running_mean");
        assert_eq!(remap("layer3.0.downsample.0.weight"), "layer3.blocks.0.downsample.conv.weight");
        assert_eq!(remap("layer4.0.downsample.1.bias"), "layer4.blocks.0.downsample.bn.bias");
    }

    #[test]
    fn test_missing_weights_file() {
        let device = Default::default();
        let result = load_pretrained::<TestBackend>(Path::new("/no/such/resnet18.pth"), &device);
        assert!(result.is_err());
    }
}
