use crate::error::CloneResult;
use crate::poisson::gradient::GradientPolicy;
use crate::poisson::session::{CloneReport, CloneSession};
use crate::poisson::system::Offset;
use crate::Image;
use image::{Pixel, Rgb};

/// ターゲット画像へ勾配領域合成（ポアソン画像編集）を行う機能を提供するトレイト
///
/// マスクで選択したソース画像の領域を、色そのものではなく局所勾配が
/// 一致するようにターゲット画像へ貼り付けます。境界ではターゲットの
/// 既存の色に一致するため、継ぎ目が目立ちません。
///
/// 同じマスクで繰り返し合成する場合は、分解を再利用できる
/// [`CloneSession`] を使用してください。
pub trait SeamlessClone {
    /// ソース画像の領域を合成した新しい画像を返します
    ///
    /// # Arguments
    ///
    /// * `source` - 貼り付け元の画像
    /// * `mask` - 貼り付ける領域（第1チャンネルが 128 を超えるピクセル）
    /// * `offset` - マスク座標からターゲット座標への平行移動量
    /// * `policy` - 勾配場の合成方針
    ///
    /// # Errors
    ///
    /// * `Error::EmptyRegion` - マスクにアクティブなピクセルがない場合
    /// * `Error::DimensionMismatch` - マスクがソース画像より大きい場合
    /// * `Error::DecompositionFailed` - 係数行列の分解に失敗した場合
    /// * `Error::SolveFailed` - チャンネルの求解に失敗した場合
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use image::{Luma, Rgb};
    /// use poisson_clone::{GradientPolicy, Image, Offset, SeamlessClone};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let source: Image<Rgb<u8>> = Image::new(16, 16);
    /// let mask: Image<Luma<u8>> = Image::from_fn(16, 16, |x, y| {
    ///     let inside = (2..14).contains(&x) && (2..14).contains(&y);
    ///     Luma([if inside { 255 } else { 0 }])
    /// });
    /// let target: Image<Rgb<u8>> = Image::new(64, 64);
    ///
    /// let result =
    ///     target.seamless_clone(&source, &mask, Offset::new(8, 8), GradientPolicy::Import)?;
    /// # Ok(())
    /// # }
    /// ```
    fn seamless_clone<P>(
        self,
        source: &Image<Rgb<u8>>,
        mask: &Image<P>,
        offset: Offset,
        policy: GradientPolicy,
    ) -> CloneResult<Self>
    where
        Self: Sized,
        P: Pixel<Subpixel = u8>;

    /// インプレースで合成し、合成レポートを返します
    ///
    /// 失敗時、ターゲットは未変更か、失敗したチャンネルより前の
    /// チャンネルだけが書き換えられた状態になります。
    fn seamless_clone_mut<P>(
        &mut self,
        source: &Image<Rgb<u8>>,
        mask: &Image<P>,
        offset: Offset,
        policy: GradientPolicy,
    ) -> CloneResult<CloneReport>
    where
        P: Pixel<Subpixel = u8>;
}

impl SeamlessClone for Image<Rgb<u8>> {
    fn seamless_clone<P>(
        mut self,
        source: &Image<Rgb<u8>>,
        mask: &Image<P>,
        offset: Offset,
        policy: GradientPolicy,
    ) -> CloneResult<Self>
    where
        P: Pixel<Subpixel = u8>,
    {
        self.seamless_clone_mut(source, mask, offset, policy)?;
        Ok(self)
    }

    fn seamless_clone_mut<P>(
        &mut self,
        source: &Image<Rgb<u8>>,
        mask: &Image<P>,
        offset: Offset,
        policy: GradientPolicy,
    ) -> CloneResult<CloneReport>
    where
        P: Pixel<Subpixel = u8>,
    {
        let mut session = CloneSession::new(policy);
        session.set_mask(mask)?.set_offset(offset);
        session.apply(source, self)
    }
}
