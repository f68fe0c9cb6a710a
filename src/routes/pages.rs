// 静态页面，无服务端逻辑

pub const USAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>使用说明</title>
</head>
<body>
  <h1>使用说明</h1>
  <p>请求格式：</p>
  <pre>/?prompt={提示词}&amp;size={宽x高}&amp;optimization={0|1}</pre>
  <ul>
    <li><strong>prompt</strong>：（必填）图像描述，例如“一位女孩”。</li>
    <li><strong>size</strong>：（可选）格式为 <code>宽x高</code>，默认 <code>512x512</code>。</li>
    <li><strong>optimization</strong>：（可选）值为 <code>1</code> 时优化提示词。</li>
    <li><strong>id</strong>：（可选）生成成功后重定向地址中附带的缓存标识，再次请求时直接返回已生成的图片。</li>
  </ul>
  <p>示例：<code>/?prompt=一位女孩&amp;size=512x512&amp;optimization=1</code></p>
  <p>网页表单：<a href="/gui/">/gui/</a></p>
</body>
</html>
"#;

pub const GUI_HTML: &str = r#"<!DOCTYPE html>
<html lang="zh">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>图像生成</title>
</head>
<body>
  <form id="form">
    <input name="prompt" placeholder="提示词" required>
    <input name="size" value="512x512" pattern="[0-9]+x[0-9]+">
    <label><input type="checkbox" name="optimization" value="1"> 优化</label>
    <button type="submit">生成</button>
  </form>
  <img id="result" alt="">
  <script>
    document.getElementById('form').addEventListener('submit', function (e) {
      e.preventDefault();
      var params = new URLSearchParams(new FormData(e.target));
      document.getElementById('result').src = '/?' + params.toString();
    });
  </script>
</body>
</html>
"#;
