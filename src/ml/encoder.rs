// ============================================================
// Layer 5 — Image Encoder
// ============================================================
// A small VGG-style CNN. Every stage is
//
//   conv 3×3 → ReLU → conv 3×3 → ReLU → max-pool 2×2
//
// and the output of every stage is kept, giving feature maps
// at 1/2, 1/4, 1/8 and 1/16 of the input resolution. The mesh
// deformation blocks sample all of them at the projected
// vertex positions (perceptual feature pooling).
//
// Reference: Simonyan & Zisserman (2015) VGG
//            Burn Book §3 (Building Blocks)

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

#[derive(Module, Debug)]
pub struct EncoderStage<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool:  MaxPool2d,
    relu:  Relu,
}

impl<B: Backend> EncoderStage<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = |i: usize, o: usize| -> Conv2d<B> {
            Conv2dConfig::new([i, o], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };
        Self {
            conv1: conv(in_channels, out_channels),
            conv2: conv(out_channels, out_channels),
            pool:  MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            relu:  Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.relu.forward(self.conv1.forward(x));
        let x = self.relu.forward(self.conv2.forward(x));
        self.pool.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct ImageEncoder<B: Backend> {
    stages: Vec<EncoderStage<B>>,
}

impl<B: Backend> ImageEncoder<B> {
    /// One stage per entry of `channels`; the input has 3 channels.
    pub fn new(channels: &[usize], device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(channels.len());
        let mut in_ch = 3;
        for &out_ch in channels {
            stages.push(EncoderStage::new(in_ch, out_ch, device));
            in_ch = out_ch;
        }
        Self { stages }
    }

    /// images: [B, 3, S, S] → one feature map per stage, finest first
    pub fn forward(&self, images: Tensor<B, 4>) -> Vec<Tensor<B, 4>> {
        let mut maps = Vec::with_capacity(self.stages.len());
        let mut x = images;
        for stage in &self.stages {
            x = stage.forward(x);
            maps.push(x.clone());
        }
        maps
    }
}
