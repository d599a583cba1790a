use crate::coding::CodingProcess;
use crate::error::{malformed, unsupported};
use crate::sample_precision::SamplePrecision;
use anyhow::Result;

fn ceil_div(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub(crate) process: CodingProcess,

    /// P: Specifies the precision in bits for the samples of the components in the frame
    pub(crate) precision: SamplePrecision,

    /// Y: Number of lines -- Specifies the maximum number of lines in the source image. This shall
    /// be equal to the number of lines in the component with the maximum number of vertical
    /// samples. Zero until a DNL segment supplies it, when the frame header deferred it.
    pub(crate) image_height: usize,

    /// X: Number of samples per line -- Specifies the maximum number of samples per line in the
    /// source image.
    pub(crate) image_width: usize,

    pub(crate) components: Vec<Component>,

    /// Hmax and Vmax over all components.
    pub(crate) max_h: u8,
    pub(crate) max_v: u8,

    /// MCU grid of an interleaved scan.
    pub(crate) mcus_per_line: usize,
    pub(crate) mcu_rows: usize,
}

/// One of the two-dimensional arrays which comprise an image
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Ci: Assigns a unique label to the ith component in the sequence of frame component
    /// specification parameters. Scan headers use these values to identify the components in
    /// the scan.
    pub(crate) component_id: u8,

    /// Hi: Specifies the relationship between the component horizontal dimension and
    /// `image_width`; also specifies the number of horizontal data units of component Ci in each
    /// MCU, when more than one component is encoded in a scan.
    pub(crate) horizontal_sampling_factor: u8,

    /// Vi: Same as `horizontal_sampling_factor`, vertically.
    pub(crate) vertical_sampling_factor: u8,

    /// Tqi: Specifies one of four possible quantization destinations from which the quantization
    /// table used to dequantize the DCT coefficients of component Ci is retrieved.
    pub(crate) qt_table_id: u8,

    /// Samples per line and lines of this component, ceil(X * Hi / Hmax) by ceil(Y * Vi / Vmax).
    pub(crate) sample_width: usize,
    pub(crate) sample_height: usize,

    /// Blocks needed to cover the samples. A non-interleaved scan codes exactly these.
    pub(crate) block_cols: usize,
    pub(crate) block_rows: usize,

    /// Blocks stored for the component, padded out to whole MCUs. Interleaved scans code all of
    /// them.
    pub(crate) grid_cols: usize,
    pub(crate) grid_rows: usize,
}

impl Component {
    pub(crate) fn from(component_id: u8, horizontal_sf: u8, vertical_sf: u8, qt_table_id: u8) -> Self {
        Component {
            component_id,
            horizontal_sampling_factor: horizontal_sf,
            vertical_sampling_factor: vertical_sf,
            qt_table_id,
            sample_width: 0,
            sample_height: 0,
            block_cols: 0,
            block_rows: 0,
            grid_cols: 0,
            grid_rows: 0,
        }
    }

    /// Whether the sampled width stops partway through the last column of blocks.
    pub(crate) fn partial_right_edge(&self) -> bool {
        self.sample_width % 8 != 0
    }

    pub(crate) fn partial_bottom_edge(&self) -> bool {
        self.sample_height % 8 != 0
    }

    pub(crate) fn blocks_per_mcu(&self) -> usize {
        self.horizontal_sampling_factor as usize * self.vertical_sampling_factor as usize
    }
}

impl FrameHeader {
    pub(crate) fn new(
        process: CodingProcess,
        precision: SamplePrecision,
        image_width: usize,
        image_height: usize,
    ) -> Self {
        FrameHeader {
            process,
            precision,
            image_height,
            image_width,
            components: Vec::with_capacity(3),
            max_h: 1,
            max_v: 1,
            mcus_per_line: 0,
            mcu_rows: 0,
        }
    }

    /// Records a component and recomputes the derived geometry of all of them, since a new
    /// component can raise Hmax or Vmax.
    pub(crate) fn add_component(&mut self, component: Component) -> Result<()> {
        let (h, v) = (
            component.horizontal_sampling_factor,
            component.vertical_sampling_factor,
        );
        if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
            return Err(malformed(format!(
                "component {} has sampling factors {h}x{v}",
                component.component_id
            )));
        }
        if component.qt_table_id > 3 {
            return Err(malformed(format!(
                "component {} selects quantization table {}",
                component.component_id, component.qt_table_id
            )));
        }
        if self.component_index(component.component_id).is_some() {
            return Err(malformed(format!(
                "component id {} appears twice in the frame",
                component.component_id
            )));
        }

        self.components.push(component);
        self.update_geometry();

        Ok(())
    }

    /// Rejects sampling factors that do not divide Hmax and Vmax, which would need fractional
    /// upsampling.
    pub(crate) fn validate_sampling(&self) -> Result<()> {
        for component in &self.components {
            if self.max_h % component.horizontal_sampling_factor != 0
                || self.max_v % component.vertical_sampling_factor != 0
            {
                return Err(unsupported(format!(
                    "component {} sampling {}x{} against a {}x{} maximum",
                    component.component_id,
                    component.horizontal_sampling_factor,
                    component.vertical_sampling_factor,
                    self.max_h,
                    self.max_v
                )));
            }
        }

        Ok(())
    }

    /// Applies the line count a DNL segment supplies.
    pub(crate) fn set_height(&mut self, image_height: usize) {
        self.image_height = image_height;
        self.update_geometry();
    }

    fn update_geometry(&mut self) {
        self.max_h = self
            .components
            .iter()
            .map(|c| c.horizontal_sampling_factor)
            .max()
            .unwrap_or(1);
        self.max_v = self
            .components
            .iter()
            .map(|c| c.vertical_sampling_factor)
            .max()
            .unwrap_or(1);

        let (max_h, max_v) = (self.max_h as usize, self.max_v as usize);
        self.mcus_per_line = ceil_div(self.image_width, 8 * max_h);
        self.mcu_rows = ceil_div(self.image_height, 8 * max_v);

        for component in self.components.iter_mut() {
            let h = component.horizontal_sampling_factor as usize;
            let v = component.vertical_sampling_factor as usize;

            component.sample_width = ceil_div(self.image_width * h, max_h);
            component.sample_height = ceil_div(self.image_height * v, max_v);
            component.block_cols = ceil_div(component.sample_width, 8);
            component.block_rows = ceil_div(component.sample_height, 8);
            component.grid_cols = self.mcus_per_line * h;
            component.grid_rows = self.mcu_rows * v;
        }
    }

    pub(crate) fn component_index(&self, component_id: u8) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.component_id == component_id)
    }

    pub fn width(&self) -> usize {
        self.image_width
    }

    pub fn height(&self) -> usize {
        self.image_height
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }
}
