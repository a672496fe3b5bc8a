//! Multi-band raster stack (one band per time step)

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{Domain, GeoReference, GeoTransform, Raster, RasterElement};
use ndarray::{s, Array2, Array3};

/// A georeferenced 3D grid stored band-major as `(band, row, col)`.
///
/// Algorithms never iterate the stack directly: they copy the z-profile of
/// a pixel into a local buffer with [`RasterStack::z_profile`], work on it,
/// and write results back with [`RasterStack::set_z_profile`].
#[derive(Debug, Clone)]
pub struct RasterStack<T: RasterElement> {
    data: Array3<T>,
    transform: GeoTransform,
    crs: Option<Crs>,
    domain: Option<Domain>,
}

impl<T: RasterElement> RasterStack<T> {
    pub fn new(bands: usize, rows: usize, cols: usize) -> Self {
        Self::from_array(Array3::zeros((bands, rows, cols)))
    }

    pub fn filled(bands: usize, rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array3::from_elem((bands, rows, cols), value))
    }

    /// Create from band-major data: all of band 0, then band 1, ...
    pub fn from_vec(data: Vec<T>, bands: usize, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != bands * rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array3::from_shape_vec((bands, rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    pub fn from_array(data: Array3<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            domain: None,
        }
    }

    /// Stack single-band rasters of identical size; metadata from the first
    pub fn from_bands(bands: &[Raster<T>]) -> Result<Self> {
        let first = bands.first().ok_or(Error::InsufficientBands {
            required: 1,
            actual: 0,
        })?;
        let (rows, cols) = first.shape();

        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (i, band) in bands.iter().enumerate() {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
            data.slice_mut(s![i, .., ..]).assign(band.data());
        }

        let mut stack = Self::from_array(data);
        stack.transform = *first.transform();
        stack.crs = first.crs().cloned();
        Ok(stack)
    }

    /// Same grid and band count, different cell type; contents zeroed
    pub fn with_same_meta<U: RasterElement>(&self) -> RasterStack<U> {
        RasterStack {
            data: Array3::zeros(self.data.dim()),
            transform: self.transform,
            crs: self.crs.clone(),
            domain: None,
        }
    }

    /// Single-band raster on the same grid; contents zeroed
    pub fn band_like<U: RasterElement>(&self) -> Raster<U> {
        let mut raster = Raster::from_array(Array2::zeros((self.rows(), self.cols())));
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster
    }

    pub fn bands(&self) -> usize {
        self.data.dim().0
    }

    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, band: usize, row: usize, col: usize) -> Result<T> {
        self.data
            .get((band, row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    pub fn set(&mut self, band: usize, row: usize, col: usize, value: T) -> Result<()> {
        let (_, rows, cols) = self.shape();
        match self.data.get_mut((band, row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    /// Value at a band-major linear index
    pub fn get_linear(&self, index: usize) -> Option<T> {
        let (_, rows, cols) = self.shape();
        let plane = rows * cols;
        if plane == 0 || index >= self.len() {
            return None;
        }
        let band = index / plane;
        let rem = index % plane;
        self.data.get((band, rem / cols, rem % cols)).copied()
    }

    /// Copy the values of all bands at (row, col) into a new buffer.
    ///
    /// Undefined cells become `NaN`.
    pub fn z_profile(&self, row: usize, col: usize) -> Result<Vec<f64>> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(self
            .data
            .slice(s![.., row, col])
            .iter()
            .map(|&v| RasterElement::to_f64(v))
            .collect())
    }

    /// Write a z-profile back; `profile.len()` must equal the band count
    pub fn set_z_profile(&mut self, row: usize, col: usize, profile: &[f64]) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        if profile.len() != self.bands() {
            return Err(Error::InsufficientBands {
                required: self.bands(),
                actual: profile.len(),
            });
        }
        for (cell, &v) in self
            .data
            .slice_mut(s![.., row, col])
            .iter_mut()
            .zip(profile)
        {
            *cell = T::from_f64(v);
        }
        Ok(())
    }

    /// Copy one band out as a single-band raster
    pub fn band(&self, band: usize) -> Result<Raster<T>> {
        if band >= self.bands() {
            return Err(Error::InsufficientBands {
                required: band + 1,
                actual: self.bands(),
            });
        }
        let mut raster = Raster::from_array(self.data.slice(s![band, .., ..]).to_owned());
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_domain(self.domain.clone());
        Ok(raster)
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    pub fn set_domain(&mut self, domain: Option<Domain>) {
        self.domain = domain;
    }

    pub fn georeference(&self) -> GeoReference {
        GeoReference {
            rows: self.rows(),
            cols: self.cols(),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }
}
